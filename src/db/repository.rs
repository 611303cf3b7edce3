use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Alert, Feed};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Feed operations

    pub async fn get_feed(&self, url: &str) -> Result<Option<Feed>> {
        let url = url.to_string();
        let feed = self
            .conn
            .call(move |conn| {
                let feed = conn
                    .query_row(
                        "SELECT url, object_id FROM feeds WHERE url = ?1",
                        params![url],
                        feed_from_row,
                    )
                    .optional()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    /// Inserts the feed unless a row for its URL already exists, and returns
    /// whichever row is stored. Concurrent first registrations of one URL
    /// therefore converge on a single object id.
    pub async fn insert_feed(&self, feed: Feed) -> Result<Feed> {
        let stored = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feeds (url, object_id) VALUES (?1, ?2)
                     ON CONFLICT(url) DO NOTHING",
                    params![feed.url, feed.object_id],
                )?;
                let stored = conn.query_row(
                    "SELECT url, object_id FROM feeds WHERE url = ?1",
                    params![feed.url],
                    feed_from_row,
                )?;
                Ok(stored)
            })
            .await?;
        Ok(stored)
    }

    #[cfg(test)]
    pub async fn feed_count(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM feeds", [], |row| row.get(0))?))
            .await?;
        Ok(count)
    }

    // Alert operations

    pub async fn insert_alert(&self, alert: Alert) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO alerts (feed_url, trigger_id, destination_email, query)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        alert.feed_url,
                        alert.trigger_id,
                        alert.destination_email,
                        alert.query
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_alert(&self, trigger_id: &str) -> Result<Option<Alert>> {
        let trigger_id = trigger_id.to_string();
        let alert = self
            .conn
            .call(move |conn| {
                let alert = conn
                    .query_row(
                        "SELECT feed_url, trigger_id, destination_email, query
                         FROM alerts WHERE trigger_id = ?1",
                        params![trigger_id],
                        alert_from_row,
                    )
                    .optional()?;
                Ok(alert)
            })
            .await?;
        Ok(alert)
    }

    pub async fn get_alerts_for_email(&self, email: &str) -> Result<Vec<Alert>> {
        let email = email.to_string();
        let alerts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT feed_url, trigger_id, destination_email, query
                     FROM alerts WHERE destination_email = ?1 ORDER BY id",
                )?;
                let alerts = stmt
                    .query_map(params![email], alert_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(alerts)
            })
            .await?;
        Ok(alerts)
    }

    /// Returns whether a row was removed.
    pub async fn delete_alert(&self, trigger_id: &str) -> Result<bool> {
        let trigger_id = trigger_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let n =
                    conn.execute("DELETE FROM alerts WHERE trigger_id = ?1", params![trigger_id])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }

    // Email secret operations

    pub async fn get_secret(&self, email: &str) -> Result<Option<String>> {
        let email = email.to_string();
        let secret = self
            .conn
            .call(move |conn| {
                let secret = conn
                    .query_row(
                        "SELECT secret FROM emails WHERE email = ?1",
                        params![email],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(secret)
            })
            .await?;
        Ok(secret)
    }

    /// Stores `secret` for `email` unless one already exists. An existing
    /// secret is never overwritten. Returns whether the new secret was stored.
    pub async fn insert_secret_if_absent(&self, email: &str, secret: &str) -> Result<bool> {
        let email = email.to_string();
        let secret = secret.to_string();
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT INTO emails (email, secret) VALUES (?1, ?2)
                     ON CONFLICT(email) DO NOTHING",
                    params![email, secret],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(inserted)
    }

    #[cfg(test)]
    pub async fn secret_count(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))?))
            .await?;
        Ok(count)
    }
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        url: row.get(0)?,
        object_id: row.get(1)?,
    })
}

fn alert_from_row(row: &Row) -> rusqlite::Result<Alert> {
    Ok(Alert {
        feed_url: row.get(0)?,
        trigger_id: row.get(1)?,
        destination_email: row.get(2)?,
        query: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_alert(trigger_id: &str, email: &str) -> Alert {
        Alert {
            feed_url: "https://example.com/rss".to_string(),
            trigger_id: trigger_id.to_string(),
            destination_email: email.to_string(),
            query: "rust".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_feed_keeps_first_object_id() {
        let repo = Repository::open_in_memory().await.unwrap();
        let first = repo
            .insert_feed(Feed {
                url: "https://example.com/rss".to_string(),
                object_id: "obj-1".to_string(),
            })
            .await
            .unwrap();
        let second = repo
            .insert_feed(Feed {
                url: "https://example.com/rss".to_string(),
                object_id: "obj-2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(first.object_id, "obj-1");
        assert_eq!(second.object_id, "obj-1");
        assert_eq!(repo.feed_count().await.unwrap(), 1);
        assert_eq!(
            repo.get_feed("https://example.com/rss").await.unwrap(),
            Some(first)
        );
        assert!(repo.get_feed("https://example.com/other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn alerts_are_listed_and_deleted_by_trigger() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.insert_alert(new_alert("t1", "a@x.com")).await.unwrap();
        repo.insert_alert(new_alert("t2", "a@x.com")).await.unwrap();
        repo.insert_alert(new_alert("t3", "b@x.com")).await.unwrap();

        let alerts = repo.get_alerts_for_email("a@x.com").await.unwrap();
        let ids: Vec<_> = alerts.iter().map(|a| a.trigger_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);

        let alert = repo.get_alert("t3").await.unwrap().unwrap();
        assert_eq!(alert.destination_email, "b@x.com");

        assert!(repo.delete_alert("t1").await.unwrap());
        assert!(!repo.delete_alert("t1").await.unwrap());
        assert!(repo.get_alert("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_trigger_id_is_rejected() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.insert_alert(new_alert("t1", "a@x.com")).await.unwrap();
        assert!(repo.insert_alert(new_alert("t1", "b@x.com")).await.is_err());
    }

    #[tokio::test]
    async fn secret_is_never_overwritten() {
        let repo = Repository::open_in_memory().await.unwrap();
        assert!(repo.insert_secret_if_absent("a@x.com", "s1").await.unwrap());
        assert!(!repo.insert_secret_if_absent("a@x.com", "s2").await.unwrap());
        assert_eq!(repo.get_secret("a@x.com").await.unwrap().as_deref(), Some("s1"));
        assert_eq!(repo.secret_count().await.unwrap(), 1);
        assert!(repo.get_secret("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.db");
        let path = path.to_string_lossy().to_string();

        {
            let repo = Repository::new(&path).await.unwrap();
            repo.insert_alert(new_alert("t1", "a@x.com")).await.unwrap();
        }

        let repo = Repository::new(&path).await.unwrap();
        let alert = repo.get_alert("t1").await.unwrap().unwrap();
        assert_eq!(alert.query, "rust");
    }
}

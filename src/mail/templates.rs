use anyhow::Context;
use handlebars::Handlebars;
use serde_json::json;

use crate::digest::Digest;
use crate::error::Result;

const DIGEST_SUBJECT: &str = "digest-subject";
const DIGEST_BODY: &str = "digest-body";
const LOGIN_SUBJECT: &str = "login-subject";
const LOGIN_BODY: &str = "login-body";

/// Subject and HTML body produced from one of the registered templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub html_body: String,
}

/// Handlebars registry for every email the service sends. Values are HTML
/// escaped in bodies; subjects are plain text and use triple-stash.
pub struct MailTemplates {
    reg: Handlebars<'static>,
}

impl MailTemplates {
    pub fn new() -> anyhow::Result<Self> {
        let mut reg = Handlebars::new();
        register_templates(&mut reg)?;
        Ok(Self { reg })
    }

    pub fn digest(&self, digest: &Digest) -> Result<RenderedMail> {
        let subject = self
            .reg
            .render(DIGEST_SUBJECT, digest)
            .context("rendering digest-subject template")?;
        let html_body = self
            .reg
            .render(DIGEST_BODY, digest)
            .context("rendering digest-body template")?;
        Ok(RenderedMail { subject, html_body })
    }

    pub fn login(&self, manage_url: &str) -> Result<RenderedMail> {
        let data = json!({ "manage_url": manage_url });
        let subject = self
            .reg
            .render(LOGIN_SUBJECT, &data)
            .context("rendering login-subject template")?;
        let html_body = self
            .reg
            .render(LOGIN_BODY, &data)
            .context("rendering login-body template")?;
        Ok(RenderedMail { subject, html_body })
    }
}

fn register_templates(registry: &mut Handlebars<'static>) -> anyhow::Result<()> {
    registry
        .register_template_string(DIGEST_SUBJECT, r#"New content matches for {{{feed_url}}}"#)
        .context("registering digest-subject template")?;

    registry
        .register_template_string(
            DIGEST_BODY,
            r#"<p>New content matches for <pre>{{feed_url}}</pre>:</p><br><br>
{{#each sections}}
<p>{{#if link}}<a href="{{link}}">{{title}}</a>{{else}}{{title}}{{/if}}:</p><br>
<ul>{{#each snippets}}<li>{{this}}</li>{{/each}}</ul><br><br>
{{/each}}"#,
        )
        .context("registering digest-body template")?;

    registry
        .register_template_string(LOGIN_SUBJECT, r#"RSS Alert Login"#)
        .context("registering login-subject template")?;

    registry
        .register_template_string(
            LOGIN_BODY,
            r#"<p>Here's your (secure) link to manage your RSS alerts:
<a href="{{manage_url}}">{{manage_url}}</a>.</p>
<p>If you didn't request this link, please ignore this email.</p>"#,
        )
        .context("registering login-body template")?;

    Ok(())
}

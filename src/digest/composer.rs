use handlebars::{handlebars_helper, Handlebars};

use crate::domain::Digest;
use crate::errors::DigestResult;

const TEMPLATE_NAME: &str = "digest";
const DEFAULT_TEMPLATE: &str = include_str!("templates/digest.hbs");

/// Renders digests into complete RFC 5322 messages.
///
/// Built once per process and shared by reference across recipients.
pub struct EmailComposer {
    handlebars: Handlebars<'static>,
}

impl EmailComposer {
    pub fn new() -> DigestResult<Self> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Use a custom message template. It sees the digest fields `from`, `to`,
    /// `subject`, `date`, `feeds` and `bad_feeds`, and the `quoteprintable` helper
    /// (with an optional `indent` hash argument).
    pub fn with_template(template: &str) -> DigestResult<Self> {
        let mut handlebars = Handlebars::new();

        // Messages are plain text
        handlebars.register_escape_fn(handlebars::no_escape);

        // The indent goes through the encoder too, so wrapped lines stay within 76 columns
        handlebars_helper!(quoteprintable: |text: str, {indent: str = ""}| {
            to_quoted_printable(&format!("{}{}", indent, text))
        });
        handlebars.register_helper("quoteprintable", Box::new(quoteprintable));

        handlebars.register_template_string(TEMPLATE_NAME, template)?;

        Ok(Self { handlebars })
    }

    /// Render the message, with CRLF line endings, ready for SMTP.
    pub fn compose(&self, digest: &Digest) -> DigestResult<Vec<u8>> {
        let rendered = self.handlebars.render(TEMPLATE_NAME, digest)?;
        Ok(to_crlf(&rendered).into_bytes())
    }
}

/// Encode text as quoted-printable so it can sit in a `quoted-printable` body.
///
/// Short printable ASCII without `=` comes back unchanged.
pub fn to_quoted_printable(text: &str) -> String {
    quoted_printable::encode_to_str(text.as_bytes())
}

fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

//! Downloadable renderings of a history result.
//!
//! Both formats carry the same flat record per audit entry: `entity_id`,
//! `user`, `action`, `date` (`%Y-%m-%d %H:%M:%S`, UTC) and `text`. XML wraps
//! the records as `<Actions><Action>…</Action></Actions>`.

use std::io::Cursor;

use arbor_core::history::{AuditAction, AuditEntry};
use axum::{
  http::header,
  response::{IntoResponse, Response},
};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
  Json,
  Xml,
}

impl Format {
  pub fn extension(self) -> &'static str {
    match self {
      Format::Json => "json",
      Format::Xml => "xml",
    }
  }
}

/// One audit entry as it appears in a download.
#[derive(Debug, Serialize)]
pub struct ExportedAction<'a> {
  pub entity_id: i64,
  pub user:      &'a str,
  pub action:    AuditAction,
  pub date:      String,
  pub text:      Option<&'a str>,
}

impl<'a> From<&'a AuditEntry> for ExportedAction<'a> {
  fn from(entry: &'a AuditEntry) -> Self {
    Self {
      entity_id: entry.entity_id,
      user:      &entry.actor,
      action:    entry.action,
      date:      entry.at.format(DATE_FORMAT).to_string(),
      text:      entry.text.as_deref(),
    }
  }
}

pub fn render(entries: &[AuditEntry], format: Format) -> Result<Vec<u8>, ApiError> {
  let actions: Vec<ExportedAction<'_>> = entries.iter().map(ExportedAction::from).collect();
  match format {
    Format::Json => serde_json::to_vec(&actions).map_err(|e| ApiError::Export(e.to_string())),
    Format::Xml => to_xml(&actions).map_err(|e| ApiError::Export(e.to_string())),
  }
}

fn to_xml(actions: &[ExportedAction<'_>]) -> std::io::Result<Vec<u8>> {
  let mut w = Writer::new(Cursor::new(Vec::new()));

  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  w.write_event(Event::Start(BytesStart::new("Actions")))?;
  for action in actions {
    w.write_event(Event::Start(BytesStart::new("Action")))?;
    write_text_elem(&mut w, "entity_id", &action.entity_id.to_string())?;
    write_text_elem(&mut w, "user", action.user)?;
    write_text_elem(&mut w, "action", action.action.as_ref())?;
    write_text_elem(&mut w, "date", &action.date)?;
    match action.text {
      Some(text) => write_text_elem(&mut w, "text", text)?,
      None => w.write_event(Event::Empty(BytesStart::new("text")))?,
    }
    w.write_event(Event::End(BytesEnd::new("Action")))?;
  }
  w.write_event(Event::End(BytesEnd::new("Actions")))?;

  Ok(w.into_inner().into_inner())
}

fn write_text_elem(
  w: &mut Writer<Cursor<Vec<u8>>>,
  tag: &str,
  text: &str,
) -> std::io::Result<()> {
  w.write_event(Event::Start(BytesStart::new(tag)))?;
  w.write_event(Event::Text(BytesText::new(text)))?;
  w.write_event(Event::End(BytesEnd::new(tag)))
}

/// Serve `entries` as a file attachment named `{user}_history.{ext}`.
pub fn attachment(
  user: &str,
  entries: &[AuditEntry],
  format: Format,
) -> Result<Response, ApiError> {
  let body = render(entries, format)?;
  let disposition = content_disposition(&format!("{user}_history.{}", format.extension()));
  Ok(
    (
      [
        (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      body,
    )
      .into_response(),
  )
}

/// An `attachment` disposition with `name` as a quoted string.
///
/// Quotes and backslashes are escaped; anything outside printable ASCII
/// becomes `_` so the header value stays valid.
fn content_disposition(name: &str) -> String {
  let mut value = String::with_capacity(name.len() + 24);
  value.push_str("attachment; filename=\"");
  for c in name.chars() {
    match c {
      '"' | '\\' => {
        value.push('\\');
        value.push(c);
      }
      ' '..='~' => value.push(c),
      _ => value.push('_'),
    }
  }
  value.push('"');
  value
}

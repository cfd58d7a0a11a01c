//! Query parameter sets and their query-string encoding.
//!
//! Every parameter set is a [`QueryParams`] bound to a static table of
//! [`FieldSpec`]s. The table fixes the field order, the serialization kind of each
//! field and its aliases, and a single routine ([`QueryParams::encode`]) turns any
//! set into its wire form. The typed sets ([`ListQuery`], [`DocumentQuery`],
//! [`SaveQuery`], [`DeleteQuery`], [`AttachmentQuery`]) only add builder methods on
//! top of their table.
//!
//! # Encoding rules
//!
//! | kind              | wire form                       |
//! |-------------------|---------------------------------|
//! | bool              | `name=true` / `name=false`      |
//! | batch flag        | `name=ok` when true, else none  |
//! | string (bare)     | `name=value`                    |
//! | string (quoted)   | `name="value"`                  |
//! | int               | `name=42`                       |
//! | enum              | `name=<wire name>`              |
//! | string list       | `name=["a","b"]`                |
//! | open revisions    | `name=all` or a string list     |
//!
//! Unset fields are never emitted and pairs are joined with `&`.
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::query::ListQuery;
//!
//! let query = ListQuery::new()
//!     .start_key("a")
//!     .include_docs(true)
//!     .limit(10);
//!
//! assert_eq!(query.encode(), "include_docs=true&limit=10&startkey=\"a\"");
//! ```

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::Value;

use crate::error::{CouchError, CouchResult};

/// Bytes that would end or split a query value. Quotes and brackets stay readable.
const QUERY_VALUE: &AsciiSet = &CONTROLS.add(b' ').add(b'&').add(b'#').add(b'+').add(b'%');

/// How a string field is written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Document identifiers and revisions: written as-is.
    Bare,
    /// Keys used for list filtering: written as a JSON string.
    Quoted,
}

/// Serialization kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    /// Boolean that is only ever written as `name=ok`.
    BatchFlag,
    String(Quoting),
    Int,
    Enum,
    StringList,
    OpenRevisions,
}

/// One row of a parameter table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical (wire) name.
    pub name: &'static str,
    /// Alternate names resolving to the same slot. Never serialized.
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, aliases: &[], kind }
    }

    pub const fn aliased(name: &'static str, aliases: &'static [&'static str], kind: FieldKind) -> Self {
        Self { name, aliases, kind }
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// The open-revisions composite: either every leaf revision or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenRevisions {
    All,
    Revisions(Vec<String>),
}

/// A value stored in a [`QueryParams`] slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    String(String),
    Int(i64),
    Enum(&'static str),
    StringList(Vec<String>),
    OpenRevisions(OpenRevisions),
}

impl ParamValue {
    fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (ParamValue::Bool(_), FieldKind::Bool | FieldKind::BatchFlag)
                | (ParamValue::String(_), FieldKind::String(_))
                | (ParamValue::Int(_), FieldKind::Int)
                | (ParamValue::Enum(_), FieldKind::Enum)
                | (ParamValue::StringList(_), FieldKind::StringList)
                | (ParamValue::OpenRevisions(_), FieldKind::OpenRevisions)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(value) => Some(value),
            ParamValue::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// Enumerations that can be written as a query parameter value.
pub trait QueryEnum: Copy {
    /// The exact spelling the server expects.
    fn wire_name(&self) -> &'static str;
}

/// Whether a list may be answered from a stale index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stale {
    Ok,
    UpdateAfter,
}

impl QueryEnum for Stale {
    fn wire_name(&self) -> &'static str {
        match self {
            Stale::Ok => "ok",
            Stale::UpdateAfter => "update_after",
        }
    }
}

/// Whether the index is updated before, after or instead of answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    True,
    False,
    Lazy,
}

impl QueryEnum for Update {
    fn wire_name(&self) -> &'static str {
        match self {
            Update::True => "true",
            Update::False => "false",
            Update::Lazy => "lazy",
        }
    }
}

/// An ordered set of optional, declared query parameters.
#[derive(Debug, Clone)]
pub struct QueryParams {
    fields: &'static [FieldSpec],
    values: Vec<Option<ParamValue>>,
}

impl QueryParams {
    /// Creates an empty set over the given field table.
    pub fn new(fields: &'static [FieldSpec]) -> Self {
        Self {
            fields,
            values: vec![None; fields.len()],
        }
    }

    /// Returns the field table, in encoding order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    fn slot(&self, name: &str) -> CouchResult<usize> {
        self.fields
            .iter()
            .position(|field| field.answers_to(name))
            .ok_or_else(|| CouchError::invalid_argument(format!("unknown query parameter `{name}`")))
    }

    /// Assigns `value` to the slot named `name` (canonical name or alias).
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] if the name is not declared or the value
    /// does not match the field's kind.
    pub fn set(&mut self, name: &str, value: ParamValue) -> CouchResult<()> {
        let index = self.slot(name)?;
        let field = &self.fields[index];

        if !value.fits(field.kind) {
            return Err(CouchError::invalid_argument(format!(
                "query parameter `{}` expects {:?}, got {:?}",
                field.name, field.kind, value
            )));
        }

        self.values[index] = Some(value);
        Ok(())
    }

    /// Unsets the slot named `name`.
    pub fn clear(&mut self, name: &str) -> CouchResult<()> {
        let index = self.slot(name)?;
        self.values[index] = None;
        Ok(())
    }

    /// Reads the slot named `name`. Unknown names read as unset.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.slot(name)
            .ok()
            .and_then(|index| self.values[index].as_ref())
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    pub(crate) fn put(&mut self, name: &str, value: Option<ParamValue>) {
        let result = match value {
            Some(value) => self.set(name, value),
            None => self.clear(name),
        };
        debug_assert!(result.is_ok(), "{result:?}");
    }

    /// Encodes every set field, in table order, as a `&`-joined query fragment.
    pub fn encode(&self) -> String {
        self.fields
            .iter()
            .zip(&self.values)
            .filter_map(|(field, value)| encode_pair(field, value.as_ref()?))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn encode_pair(field: &FieldSpec, value: &ParamValue) -> Option<String> {
    let encoded = match (field.kind, value) {
        (FieldKind::BatchFlag, ParamValue::Bool(true)) => "ok".to_string(),
        (FieldKind::BatchFlag, ParamValue::Bool(false)) => return None,
        (FieldKind::Bool, ParamValue::Bool(flag)) => flag.to_string(),
        (FieldKind::String(Quoting::Bare), ParamValue::String(text)) => text.clone(),
        (FieldKind::String(Quoting::Quoted), ParamValue::String(text)) => Value::String(text.clone()).to_string(),
        (FieldKind::Int, ParamValue::Int(number)) => number.to_string(),
        (FieldKind::Enum, ParamValue::Enum(member)) => member.to_string(),
        (FieldKind::StringList, ParamValue::StringList(items)) => encode_list(items),
        (FieldKind::OpenRevisions, ParamValue::OpenRevisions(OpenRevisions::All)) => "all".to_string(),
        (FieldKind::OpenRevisions, ParamValue::OpenRevisions(OpenRevisions::Revisions(items))) => encode_list(items),
        _ => return None,
    };

    Some(format!("{}={}", field.name, utf8_percent_encode(&encoded, QUERY_VALUE)))
}

fn encode_list(items: &[String]) -> String {
    Value::Array(items.iter().cloned().map(Value::String).collect()).to_string()
}

/// Anything that exposes a [`QueryParams`] set.
pub trait EncodeQuery {
    fn params(&self) -> &QueryParams;

    fn encode(&self) -> String {
        self.params().encode()
    }
}

impl EncodeQuery for QueryParams {
    fn params(&self) -> &QueryParams {
        self
    }
}

/// Appends the encoded parameters to `url`.
///
/// The url is returned unchanged when `params` is `None` or encodes to nothing.
/// Otherwise the fragment is joined with `?` if the url has no query yet, directly
/// if the url ends in `?`, and with `&` if it already carries a query.
///
/// # Errors
///
/// Returns [`CouchError::InvalidArgument`] if `url` is blank.
pub fn append_to_url<Q>(url: &str, params: Option<&Q>) -> CouchResult<String>
where
    Q: EncodeQuery + ?Sized,
{
    if url.trim().is_empty() {
        return Err(CouchError::invalid_argument("url must not be blank"));
    }

    let fragment = match params {
        Some(params) => params.encode(),
        None => return Ok(url.to_string()),
    };

    if fragment.is_empty() {
        return Ok(url.to_string());
    }

    let separator = if url.ends_with('?') {
        ""
    } else if url.contains('?') {
        "&"
    } else {
        "?"
    };

    Ok(format!("{url}{separator}{fragment}"))
}

const LIST_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("conflicts", FieldKind::Bool),
    FieldSpec::new("descending", FieldKind::Bool),
    FieldSpec::aliased("endkey", &["end_key"], FieldKind::String(Quoting::Quoted)),
    FieldSpec::aliased("endkey_docid", &["end_key_doc_id"], FieldKind::String(Quoting::Bare)),
    FieldSpec::new("group", FieldKind::Bool),
    FieldSpec::new("group_level", FieldKind::Int),
    FieldSpec::new("include_docs", FieldKind::Bool),
    FieldSpec::new("attachments", FieldKind::Bool),
    FieldSpec::new("att_encoding_info", FieldKind::Bool),
    FieldSpec::new("inclusive_end", FieldKind::Bool),
    FieldSpec::new("key", FieldKind::String(Quoting::Quoted)),
    FieldSpec::new("keys", FieldKind::StringList),
    FieldSpec::new("limit", FieldKind::Int),
    FieldSpec::new("reduce", FieldKind::Bool),
    FieldSpec::new("skip", FieldKind::Int),
    FieldSpec::new("sorted", FieldKind::Bool),
    FieldSpec::new("stable", FieldKind::Bool),
    FieldSpec::new("stale", FieldKind::Enum),
    FieldSpec::aliased("startkey", &["start_key"], FieldKind::String(Quoting::Quoted)),
    FieldSpec::aliased("startkey_docid", &["start_key_doc_id"], FieldKind::String(Quoting::Bare)),
    FieldSpec::new("update", FieldKind::Enum),
    FieldSpec::new("update_seq", FieldKind::Bool),
];

const DOCUMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("attachments", FieldKind::Bool),
    FieldSpec::new("att_encoding_info", FieldKind::Bool),
    FieldSpec::new("atts_since", FieldKind::StringList),
    FieldSpec::new("conflicts", FieldKind::Bool),
    FieldSpec::new("deleted_conflicts", FieldKind::Bool),
    FieldSpec::new("latest", FieldKind::Bool),
    FieldSpec::new("local_seq", FieldKind::Bool),
    FieldSpec::new("meta", FieldKind::Bool),
    FieldSpec::new("open_revs", FieldKind::OpenRevisions),
    FieldSpec::new("rev", FieldKind::String(Quoting::Bare)),
    FieldSpec::new("revs", FieldKind::Bool),
    FieldSpec::new("revs_info", FieldKind::Bool),
];

const SAVE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("batch", FieldKind::BatchFlag),
    FieldSpec::new("new_edits", FieldKind::Bool),
];

const DELETE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("rev", FieldKind::String(Quoting::Bare)),
    FieldSpec::new("batch", FieldKind::BatchFlag),
];

const ATTACHMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("rev", FieldKind::String(Quoting::Bare)),
];

/// Parameters of a document list request (`_all_docs`).
///
/// Long-form names (`start_key`, `end_key_doc_id`, ...) are aliases of the canonical
/// short forms and write to the same slot.
#[derive(Debug, Clone)]
pub struct ListQuery {
    params: QueryParams,
}

impl ListQuery {
    pub fn new() -> Self {
        Self { params: QueryParams::new(LIST_FIELDS) }
    }

    fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.params.put(name, Some(value));
        self
    }

    pub fn conflicts(self, conflicts: bool) -> Self {
        self.with("conflicts", ParamValue::Bool(conflicts))
    }

    pub fn descending(self, descending: bool) -> Self {
        self.with("descending", ParamValue::Bool(descending))
    }

    pub fn endkey(self, key: impl Into<String>) -> Self {
        self.with("endkey", ParamValue::String(key.into()))
    }

    pub fn end_key(self, key: impl Into<String>) -> Self {
        self.with("end_key", ParamValue::String(key.into()))
    }

    pub fn endkey_docid(self, id: impl Into<String>) -> Self {
        self.with("endkey_docid", ParamValue::String(id.into()))
    }

    pub fn end_key_doc_id(self, id: impl Into<String>) -> Self {
        self.with("end_key_doc_id", ParamValue::String(id.into()))
    }

    pub fn group(self, group: bool) -> Self {
        self.with("group", ParamValue::Bool(group))
    }

    pub fn group_level(self, level: i64) -> Self {
        self.with("group_level", ParamValue::Int(level))
    }

    pub fn include_docs(self, include: bool) -> Self {
        self.with("include_docs", ParamValue::Bool(include))
    }

    pub fn attachments(self, attachments: bool) -> Self {
        self.with("attachments", ParamValue::Bool(attachments))
    }

    pub fn att_encoding_info(self, info: bool) -> Self {
        self.with("att_encoding_info", ParamValue::Bool(info))
    }

    pub fn inclusive_end(self, inclusive: bool) -> Self {
        self.with("inclusive_end", ParamValue::Bool(inclusive))
    }

    pub fn key(self, key: impl Into<String>) -> Self {
        self.with("key", ParamValue::String(key.into()))
    }

    pub fn keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with("keys", ParamValue::StringList(keys.into_iter().map(Into::into).collect()))
    }

    pub fn limit(self, limit: i64) -> Self {
        self.with("limit", ParamValue::Int(limit))
    }

    pub fn reduce(self, reduce: bool) -> Self {
        self.with("reduce", ParamValue::Bool(reduce))
    }

    pub fn skip(self, skip: i64) -> Self {
        self.with("skip", ParamValue::Int(skip))
    }

    pub fn sorted(self, sorted: bool) -> Self {
        self.with("sorted", ParamValue::Bool(sorted))
    }

    pub fn stable(self, stable: bool) -> Self {
        self.with("stable", ParamValue::Bool(stable))
    }

    pub fn stale(self, stale: Stale) -> Self {
        self.with("stale", ParamValue::Enum(stale.wire_name()))
    }

    pub fn startkey(self, key: impl Into<String>) -> Self {
        self.with("startkey", ParamValue::String(key.into()))
    }

    pub fn start_key(self, key: impl Into<String>) -> Self {
        self.with("start_key", ParamValue::String(key.into()))
    }

    pub fn startkey_docid(self, id: impl Into<String>) -> Self {
        self.with("startkey_docid", ParamValue::String(id.into()))
    }

    pub fn start_key_doc_id(self, id: impl Into<String>) -> Self {
        self.with("start_key_doc_id", ParamValue::String(id.into()))
    }

    pub fn update(self, update: Update) -> Self {
        self.with("update", ParamValue::Enum(update.wire_name()))
    }

    pub fn update_seq(self, update_seq: bool) -> Self {
        self.with("update_seq", ParamValue::Bool(update_seq))
    }

    /// Returns `true` only if `include_docs` was explicitly set to `true`.
    pub fn includes_docs(&self) -> bool {
        self.params
            .get("include_docs")
            .and_then(ParamValue::as_bool)
            .unwrap_or(false)
    }

    pub fn params_mut(&mut self) -> &mut QueryParams {
        &mut self.params
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeQuery for ListQuery {
    fn params(&self) -> &QueryParams {
        &self.params
    }
}

/// Parameters of a single document read.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    params: QueryParams,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self { params: QueryParams::new(DOCUMENT_FIELDS) }
    }

    fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.params.put(name, Some(value));
        self
    }

    pub fn attachments(self, attachments: bool) -> Self {
        self.with("attachments", ParamValue::Bool(attachments))
    }

    pub fn att_encoding_info(self, info: bool) -> Self {
        self.with("att_encoding_info", ParamValue::Bool(info))
    }

    pub fn atts_since<I, S>(self, revisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with("atts_since", ParamValue::StringList(revisions.into_iter().map(Into::into).collect()))
    }

    pub fn conflicts(self, conflicts: bool) -> Self {
        self.with("conflicts", ParamValue::Bool(conflicts))
    }

    pub fn deleted_conflicts(self, deleted: bool) -> Self {
        self.with("deleted_conflicts", ParamValue::Bool(deleted))
    }

    pub fn latest(self, latest: bool) -> Self {
        self.with("latest", ParamValue::Bool(latest))
    }

    pub fn local_seq(self, local_seq: bool) -> Self {
        self.with("local_seq", ParamValue::Bool(local_seq))
    }

    pub fn meta(self, meta: bool) -> Self {
        self.with("meta", ParamValue::Bool(meta))
    }

    /// Requests every leaf revision.
    pub fn all_open_revs(self) -> Self {
        self.with("open_revs", ParamValue::OpenRevisions(OpenRevisions::All))
    }

    /// Requests the given leaf revisions.
    pub fn open_revs<I, S>(self, revisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(
            "open_revs",
            ParamValue::OpenRevisions(OpenRevisions::Revisions(revisions.into_iter().map(Into::into).collect())),
        )
    }

    pub fn rev(self, rev: impl Into<String>) -> Self {
        self.with("rev", ParamValue::String(rev.into()))
    }

    pub fn revs(self, revs: bool) -> Self {
        self.with("revs", ParamValue::Bool(revs))
    }

    pub fn revs_info(self, revs_info: bool) -> Self {
        self.with("revs_info", ParamValue::Bool(revs_info))
    }
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeQuery for DocumentQuery {
    fn params(&self) -> &QueryParams {
        &self.params
    }
}

/// Parameters of a document write.
#[derive(Debug, Clone)]
pub struct SaveQuery {
    params: QueryParams,
}

impl SaveQuery {
    pub fn new() -> Self {
        Self { params: QueryParams::new(SAVE_FIELDS) }
    }

    /// Asks the server to acknowledge the write before committing it.
    pub fn batch(mut self, batch: bool) -> Self {
        self.params.put("batch", Some(ParamValue::Bool(batch)));
        self
    }

    pub fn new_edits(mut self, new_edits: bool) -> Self {
        self.params.put("new_edits", Some(ParamValue::Bool(new_edits)));
        self
    }
}

impl Default for SaveQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeQuery for SaveQuery {
    fn params(&self) -> &QueryParams {
        &self.params
    }
}

/// Parameters of a document deletion.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    params: QueryParams,
}

impl DeleteQuery {
    pub fn new(rev: impl Into<String>) -> Self {
        let mut params = QueryParams::new(DELETE_FIELDS);
        params.put("rev", Some(ParamValue::String(rev.into())));

        Self { params }
    }

    pub fn batch(mut self, batch: bool) -> Self {
        self.params.put("batch", Some(ParamValue::Bool(batch)));
        self
    }
}

impl EncodeQuery for DeleteQuery {
    fn params(&self) -> &QueryParams {
        &self.params
    }
}

/// Parameters of an attachment request.
#[derive(Debug, Clone)]
pub struct AttachmentQuery {
    params: QueryParams,
}

impl AttachmentQuery {
    pub fn new() -> Self {
        Self { params: QueryParams::new(ATTACHMENT_FIELDS) }
    }

    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.params.put("rev", Some(ParamValue::String(rev.into())));
        self
    }
}

impl Default for AttachmentQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeQuery for AttachmentQuery {
    fn params(&self) -> &QueryParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sets_encode_to_nothing() {
        assert_eq!(ListQuery::new().encode(), "");
        assert_eq!(DocumentQuery::new().encode(), "");
        assert_eq!(SaveQuery::new().encode(), "");
        assert_eq!(AttachmentQuery::new().encode(), "");
        assert!(ListQuery::new().params().is_empty());
    }

    #[test]
    fn test_bool_fields_emit_once() {
        assert_eq!(ListQuery::new().descending(true).encode(), "descending=true");
        assert_eq!(ListQuery::new().descending(false).encode(), "descending=false");

        let encoded = ListQuery::new()
            .include_docs(true)
            .include_docs(false)
            .encode();
        assert_eq!(encoded.matches("include_docs=").count(), 1);
        assert_eq!(encoded, "include_docs=false");
    }

    #[test]
    fn test_batch_flag_only_emits_ok() {
        assert_eq!(SaveQuery::new().batch(true).encode(), "batch=ok");
        assert_eq!(SaveQuery::new().batch(false).encode(), "");
        assert_eq!(DeleteQuery::new("1-a").batch(true).encode(), "rev=1-a&batch=ok");
        assert_eq!(DeleteQuery::new("1-a").batch(false).encode(), "rev=1-a");
    }

    #[test]
    fn test_string_quoting_is_per_field() {
        let encoded = ListQuery::new()
            .startkey("a")
            .startkey_docid("doc-a")
            .encode();
        assert_eq!(encoded, "startkey=\"a\"&startkey_docid=doc-a");

        assert_eq!(DocumentQuery::new().rev("2-b").encode(), "rev=2-b");
    }

    #[test]
    fn test_quoted_strings_are_json_escaped() {
        assert_eq!(ListQuery::new().key("say \"hi\"").encode(), "key=\"say%20\\\"hi\\\"\"");
    }

    #[test]
    fn test_reserved_characters_are_percent_encoded() {
        assert_eq!(ListQuery::new().key("a&b#c").encode(), "key=\"a%26b%23c\"");
        assert_eq!(
            ListQuery::new().startkey_docid("x+y%z").encode(),
            "startkey_docid=x%2By%25z"
        );
        assert_eq!(DeleteQuery::new("1-a&b").encode(), "rev=1-a%26b");
        assert_eq!(ListQuery::new().key("é").encode(), "key=\"%C3%A9\"");
    }

    #[test]
    fn test_int_enum_and_list_fields() {
        let encoded = ListQuery::new()
            .keys(["a", "b"])
            .limit(5)
            .skip(2)
            .stale(Stale::UpdateAfter)
            .update(Update::Lazy)
            .encode();
        assert_eq!(encoded, "keys=[\"a\",\"b\"]&limit=5&skip=2&stale=update_after&update=lazy");

        let empty: [&str; 0] = [];
        assert_eq!(ListQuery::new().keys(empty).encode(), "keys=[]");
    }

    #[test]
    fn test_open_revisions_states() {
        assert_eq!(DocumentQuery::new().all_open_revs().encode(), "open_revs=all");
        assert_eq!(
            DocumentQuery::new().open_revs(["1-a", "2-b"]).encode(),
            "open_revs=[\"1-a\",\"2-b\"]"
        );
        assert_eq!(
            DocumentQuery::new().open_revs(["1-a"]).all_open_revs().encode(),
            "open_revs=all"
        );
    }

    #[test]
    fn test_aliases_share_a_slot() {
        let query = ListQuery::new().start_key("x");
        assert_eq!(query.params().get("startkey").and_then(ParamValue::as_str), Some("x"));

        let query = query.startkey("y");
        assert_eq!(query.params().get("start_key").and_then(ParamValue::as_str), Some("y"));
        assert_eq!(query.encode(), "startkey=\"y\"");

        let query = ListQuery::new()
            .endkey_docid("a")
            .end_key_doc_id("b");
        assert_eq!(query.encode(), "endkey_docid=b");
    }

    #[test]
    fn test_fields_encode_in_table_order() {
        let encoded = ListQuery::new()
            .update_seq(true)
            .startkey("s")
            .limit(1)
            .conflicts(true)
            .encode();
        assert_eq!(encoded, "conflicts=true&limit=1&startkey=\"s\"&update_seq=true");
    }

    #[test]
    fn test_set_rejects_unknown_names_and_wrong_kinds() {
        let mut params = QueryParams::new(LIST_FIELDS);

        assert!(matches!(
            params.set("nope", ParamValue::Bool(true)),
            Err(CouchError::InvalidArgument(_))
        ));
        assert!(matches!(
            params.set("limit", ParamValue::Bool(true)),
            Err(CouchError::InvalidArgument(_))
        ));
        assert!(params.set("limit", ParamValue::Int(3)).is_ok());
        assert_eq!(params.get("limit").and_then(ParamValue::as_int), Some(3));

        params.clear("limit").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_includes_docs() {
        assert!(!ListQuery::new().includes_docs());
        assert!(!ListQuery::new().include_docs(false).includes_docs());
        assert!(ListQuery::new().include_docs(true).includes_docs());
    }

    #[test]
    fn test_append_to_url() {
        let endkey = ListQuery::new().endkey("e");

        assert_eq!(append_to_url::<ListQuery>("u", None).unwrap(), "u");
        assert_eq!(append_to_url("u", Some(&ListQuery::new())).unwrap(), "u");
        assert_eq!(append_to_url("u", Some(&endkey)).unwrap(), "u?endkey=\"e\"");
        assert_eq!(append_to_url("u?", Some(&endkey)).unwrap(), "u?endkey=\"e\"");
        assert_eq!(append_to_url("u?a=1", Some(&endkey)).unwrap(), "u?a=1&endkey=\"e\"");
    }

    #[test]
    fn test_append_to_blank_url_fails() {
        let endkey = ListQuery::new().endkey("e");

        assert!(matches!(
            append_to_url("  ", Some(&endkey)),
            Err(CouchError::InvalidArgument(_))
        ));
        assert!(matches!(
            append_to_url::<ListQuery>("", None),
            Err(CouchError::InvalidArgument(_))
        ));
    }
}

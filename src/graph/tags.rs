//! Graph tag parsing.
//!
//! A field annotation has the form `<wire-name>,<kind>[,<more-options>]`,
//! e.g. `"age,number"` or `"region,partitionKey"`. The empty annotation
//! marks a field that does not participate in the graph mapping.

/// Comma-separated option list following the name in a graph tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOptions<'a>(&'a str);

impl<'a> TagOptions<'a> {
    /// Whether `opt` appears in the option list.
    pub fn contains(&self, opt: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        self.0.split(',').any(|o| o == opt)
    }
}

/// Split a graph tag into its wire name and option list.
///
/// `parse_tag("")` yields `("", ∅)`; a tag without a comma has no options.
pub fn parse_tag(tag: &str) -> (&str, TagOptions<'_>) {
    match tag.split_once(',') {
        Some((name, opts)) => (name, TagOptions(opts)),
        None => (tag, TagOptions("")),
    }
}

/// The storage kind a graph tag assigns to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    /// JSON-string-wrapped on the server
    Struct,
    StringList,
    NumberList,
    BoolList,
    StructList,
    /// Cosmos DB partition key; string-kind on writes, `.has(…)` on updates
    PartitionKey,
}

impl FieldKind {
    /// Resolve the kind from a tag's option list, if one is present.
    pub fn from_options(opts: TagOptions<'_>) -> Option<FieldKind> {
        if opts.contains("partitionKey") {
            Some(FieldKind::PartitionKey)
        } else if opts.contains("string") {
            Some(FieldKind::String)
        } else if opts.contains("number") {
            Some(FieldKind::Number)
        } else if opts.contains("bool") {
            Some(FieldKind::Bool)
        } else if opts.contains("struct") {
            Some(FieldKind::Struct)
        } else if opts.contains("[]string") {
            Some(FieldKind::StringList)
        } else if opts.contains("[]number") {
            Some(FieldKind::NumberList)
        } else if opts.contains("[]bool") {
            Some(FieldKind::BoolList)
        } else if opts.contains("[]struct") {
            Some(FieldKind::StructList)
        } else {
            None
        }
    }

    /// Whether this kind maps to a repeated-element property.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FieldKind::StringList
                | FieldKind::NumberList
                | FieldKind::BoolList
                | FieldKind::StructList
        )
    }
}

//! Metadata of a single layout: its fields, portals and value lists.
//!
//! Fields and portals arrive with the regular result grammar. Value lists and field styles are extended information
//! that has to be requested separately with the `FMPXMLLAYOUT` grammar; [`Layout`] loads it lazily through a
//! [`LayoutSource`] the first time it is needed and keeps it for the rest of the session.

use crate::{ClientError, Grammar, RequestIntent, Result};
use indexmap::IndexMap;

/// Describes one field of a layout or portal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    name: String,
    result: String,
    field_type: String,
    global: bool,
    max_repeat: u32,
    style_type: Option<String>,
    value_list: Option<String>,
}

impl Field {
    /// A normal, non-repeating text field named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: "text".to_owned(),
            field_type: "normal".to_owned(),
            max_repeat: 1,
            ..Self::default()
        }
    }

    /// Sets the result type.
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }

    /// Sets the kind of field.
    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = field_type.into();
        self
    }

    /// Marks the field as global storage.
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Sets the number of repetitions.
    pub fn with_max_repeat(mut self, max_repeat: u32) -> Self {
        self.max_repeat = max_repeat;
        self
    }

    /// Full name of the field, `Table::Field` for fields of related tables.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the field's value, e.g. `text`, `number` or `container`.
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Kind of field, e.g. `normal`, `calculation` or `summary`.
    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    /// Returns `true` for fields with global storage.
    pub fn is_global(&self) -> bool {
        self.global
    }

    /// Number of repetitions, `1` for a plain field.
    pub fn max_repeat(&self) -> u32 {
        self.max_repeat
    }

    /// Control style on the layout, e.g. `POPUPLIST`. Known only after the extended information was loaded.
    pub fn style_type(&self) -> Option<&str> {
        self.style_type.as_deref()
    }

    /// Name of the value list attached to the field. Known only after the extended information was loaded.
    pub fn value_list(&self) -> Option<&str> {
        self.value_list.as_deref()
    }

    fn apply_style(&mut self, style: &FieldStyle) {
        self.style_type = style.style_type.clone();
        self.value_list = style.value_list.clone();
    }
}

/// A portal: records of a related table shown on the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedSet {
    name: String,
    fields: IndexMap<String, Field>,
}

impl RelatedSet {
    /// An empty portal based on the table occurrence `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field, keyed by its full name such as `Table::Field`.
    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field);
        self
    }

    /// Adds a field in place, replacing one of the same name.
    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Name of the related table occurrence.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the portal's fields, in layout order.
    pub fn list_fields(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Fields of the portal keyed by name.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }
}

/// A node of layout metadata that can resolve field names, possibly through nested portals.
pub trait MetadataNode {
    /// The field named exactly `name`.
    fn field(&self, name: &str) -> Option<&Field>;

    /// Resolves `path` to a field. Leaves only know their own fields.
    fn lookup_field(&self, path: &str) -> Result<&Field> {
        self.field(path)
            .ok_or_else(|| ClientError::FieldNotFound(path.to_owned()))
    }
}

impl MetadataNode for RelatedSet {
    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

/// One entry of a value list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueListItem {
    /// Text shown to the user.
    pub display: String,
    /// Value stored in the field.
    pub value: String,
}

impl ValueListItem {
    /// An item showing `display` and storing `value`.
    pub fn new(display: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            value: value.into(),
        }
    }
}

/// Style information of one field, as reported by the layout grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStyle {
    /// Full name of the field the style belongs to.
    pub name: String,
    /// Control style, e.g. `POPUPLIST`.
    pub style_type: Option<String>,
    /// Name of the attached value list.
    pub value_list: Option<String>,
}

/// Extended layout information, as produced by a parser of the `FMPXMLLAYOUT` grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutInfo {
    /// Styles of the fields on the layout.
    pub fields: Vec<FieldStyle>,
    /// Value lists keyed by name, items in server order.
    pub value_lists: IndexMap<String, Vec<ValueListItem>>,
}

/// What the last extended information load covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheState {
    /// No extended information was loaded yet.
    #[default]
    Unloaded,
    /// Extended information not tied to a record is loaded; later calls are served from the cache.
    BaseLoaded,
    /// Only record-scoped value lists are loaded. They do not satisfy requests without a record.
    RecordScoped,
}

/// Which record, if any, an extended information load is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadScope {
    /// Value lists that do not depend on a record.
    Base,
    /// Value lists depending on the content of this record.
    Record(String),
}

impl From<Option<&str>> for LoadScope {
    fn from(record_id: Option<&str>) -> Self {
        match record_id {
            Some(id) => LoadScope::Record(id.to_owned()),
            None => LoadScope::Base,
        }
    }
}

/// The part of the connection facade a [`Layout`] needs to load its extended information.
pub trait LayoutSource {
    /// Sends a request and returns the XML payload.
    fn execute(&mut self, intent: RequestIntent) -> Result<Vec<u8>>;

    /// Parses an `FMPXMLLAYOUT` payload.
    fn parse_layout_info(&self, payload: &[u8]) -> Result<LayoutInfo>;

    /// Keeps `layout` in the facade's layout cache, keyed by its name.
    fn cache_layout(&mut self, layout: Layout);
}

impl<S: LayoutSource + ?Sized> LayoutSource for &mut S {
    fn execute(&mut self, intent: RequestIntent) -> Result<Vec<u8>> {
        (**self).execute(intent)
    }

    fn parse_layout_info(&self, payload: &[u8]) -> Result<LayoutInfo> {
        (**self).parse_layout_info(payload)
    }

    fn cache_layout(&mut self, layout: Layout) {
        (**self).cache_layout(layout)
    }
}

/// Describes a layout of a database: its fields, portals and value lists.
///
/// # Examples
///
/// ```
/// # use fmxml::{Field, Layout, MetadataNode, RelatedSet};
/// let layout = Layout::new("Contacts", "CRM")
///     .with_field(Field::new("Name"))
///     .with_related_set(RelatedSet::new("Phones").with_field(Field::new("Phones::Number")));
///
/// assert_eq!("Name", layout.lookup_field("Name").unwrap().name());
/// assert_eq!("Phones::Number", layout.lookup_field("Phones::Number").unwrap().name());
/// assert!(!layout.extended());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    name: String,
    database: String,
    fields: IndexMap<String, Field>,
    related_sets: IndexMap<String, RelatedSet>,
    value_lists: IndexMap<String, Vec<String>>,
    value_lists_two_fields: IndexMap<String, Vec<ValueListItem>>,
    state: CacheState,
}

impl Layout {
    /// An empty layout `name` of the database `database`, without extended information.
    pub fn new(name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Adds a field, see [`Layout::add_field`].
    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field);
        self
    }

    /// Adds a portal, see [`Layout::add_related_set`].
    pub fn with_related_set(mut self, related_set: RelatedSet) -> Self {
        self.add_related_set(related_set);
        self
    }

    /// Adds a field; fields keep the order they are added in.
    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Adds a portal, replacing one based on the same table occurrence.
    pub fn add_related_set(&mut self, related_set: RelatedSet) {
        self.related_sets.insert(related_set.name.clone(), related_set);
    }

    /// Name of the layout.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database the layout belongs to. Extended information is requested from it.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Names of the fields directly on the layout, in layout order.
    pub fn list_fields(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Fields directly on the layout, keyed by name.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    /// Names of the table occurrences the portals are based on.
    pub fn list_related_sets(&self) -> Vec<&str> {
        self.related_sets.keys().map(String::as_str).collect()
    }

    /// Portals keyed by table occurrence.
    pub fn related_sets(&self) -> &IndexMap<String, RelatedSet> {
        &self.related_sets
    }

    /// The portal based on the table occurrence `name`.
    pub fn related_set(&self, name: &str) -> Result<&RelatedSet> {
        self.related_sets
            .get(name)
            .ok_or_else(|| ClientError::RelatedSetNotFound {
                name: name.to_owned(),
                layout: self.name.clone(),
            })
    }

    /// Returns `true` if a portal is based on the table occurrence `name`.
    pub fn has_related_set(&self, name: &str) -> bool {
        self.related_sets.contains_key(name)
    }

    /// `true` once extended information not tied to a record has been loaded.
    pub fn extended(&self) -> bool {
        self.state == CacheState::BaseLoaded
    }

    /// What the last extended information load covered.
    pub fn cache_state(&self) -> CacheState {
        self.state
    }

    /// Names of the value lists used on the layout.
    pub fn list_value_lists<S>(&mut self, source: &mut S) -> Result<Vec<&str>>
    where
        S: LayoutSource + ?Sized,
    {
        self.load_extended_info(source, None)?;
        Ok(self.value_lists.keys().map(String::as_str).collect())
    }

    /// Values of the value list `name`, optionally as displayed for the record `record_id`.
    pub fn value_list<S>(&mut self, source: &mut S, name: &str, record_id: Option<&str>) -> Result<Option<&[String]>>
    where
        S: LayoutSource + ?Sized,
    {
        self.load_extended_info(source, record_id)?;
        Ok(self.value_lists.get(name).map(Vec::as_slice))
    }

    /// Display names and values of the value list `name`; empty if there is no such list.
    pub fn value_list_two_fields<S>(
        &mut self,
        source: &mut S,
        name: &str,
        record_id: Option<&str>,
    ) -> Result<&[ValueListItem]>
    where
        S: LayoutSource + ?Sized,
    {
        self.load_extended_info(source, record_id)?;
        Ok(self
            .value_lists_two_fields
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// All value lists with their values.
    pub fn value_lists<S>(&mut self, source: &mut S, record_id: Option<&str>) -> Result<&IndexMap<String, Vec<String>>>
    where
        S: LayoutSource + ?Sized,
    {
        self.load_extended_info(source, record_id)?;
        Ok(&self.value_lists)
    }

    /// All value lists with their display names and values.
    pub fn value_lists_two_fields<S>(
        &mut self,
        source: &mut S,
        record_id: Option<&str>,
    ) -> Result<&IndexMap<String, Vec<ValueListItem>>>
    where
        S: LayoutSource + ?Sized,
    {
        self.load_extended_info(source, record_id)?;
        Ok(&self.value_lists_two_fields)
    }

    /// Loads the extended layout information, unless it is cached and no record is given.
    ///
    /// With a `record_id` the request is always sent and only refreshes the value lists; the layout is put into the
    /// facade's cache only by a load without one. Returns whether the base information is loaded.
    pub fn load_extended_info<S>(&mut self, source: &mut S, record_id: Option<&str>) -> Result<bool>
    where
        S: LayoutSource + ?Sized,
    {
        if self.extended() && record_id.is_none() {
            return Ok(true);
        }

        let mut intent = RequestIntent::new()
            .grammar(Grammar::LayoutInfo)
            .param("-db", self.database.as_str())
            .param("-lay", self.name.as_str());
        if let Some(record_id) = record_id {
            intent = intent.param("-recid", record_id);
        }
        let intent = intent.param("-view", "");

        tracing::debug!(layout = %self.name, record_id, "Loading extended layout information");
        let payload = source.execute(intent)?;
        let info = source.parse_layout_info(&payload)?;

        *self = std::mem::take(self).apply(info, record_id.into());
        if record_id.is_none() {
            source.cache_layout(self.clone());
        }

        Ok(self.extended())
    }

    /// Returns the layout with `info` applied: value lists replaced, field styles updated and the cache state
    /// advanced. A record-scoped load never downgrades a loaded base.
    pub fn apply(mut self, info: LayoutInfo, scope: LoadScope) -> Self {
        for style in &info.fields {
            if let Some(field) = self.field_mut(&style.name) {
                field.apply_style(style);
            }
        }

        self.value_lists = info
            .value_lists
            .iter()
            .map(|(name, items)| (name.clone(), items.iter().map(|item| item.value.clone()).collect()))
            .collect();
        self.value_lists_two_fields = info.value_lists;

        self.state = match (self.state, scope) {
            (_, LoadScope::Base) => CacheState::BaseLoaded,
            (CacheState::BaseLoaded, LoadScope::Record(_)) => CacheState::BaseLoaded,
            (_, LoadScope::Record(_)) => CacheState::RecordScoped,
        };
        self
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        if self.fields.contains_key(name) {
            return self.fields.get_mut(name);
        }
        let (related_set, _) = split_related(name)?;
        self.related_sets.get_mut(related_set)?.fields.get_mut(name)
    }
}

impl MetadataNode for Layout {
    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Resolves `path` on the layout or, for `Table:Field` names, in the portal of `Table`. The portal resolves the
    /// full name.
    fn lookup_field(&self, path: &str) -> Result<&Field> {
        if let Some(field) = self.field(path) {
            return Ok(field);
        }
        match split_related(path) {
            Some((related_set, _)) => self.related_set(related_set)?.lookup_field(path),
            None => Err(ClientError::FieldNotFound(path.to_owned())),
        }
    }
}

/// Splits `Table:Field` (or `Table::Field`) at the first separator. A leading separator does not count.
fn split_related(path: &str) -> Option<(&str, &str)> {
    match path.find(':') {
        Some(0) | None => None,
        Some(position) => Some((&path[..position], path[position + 1..].trim_start_matches(':'))),
    }
}

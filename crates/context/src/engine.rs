// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion context engine
//!
//! [`CompletionEngine::prepare`] locates the cursor inside a [`SemanticModel`]
//! and [`CompletionContext::prepare_proposal`] turns that location into
//! ranked [`CompletionSet`]s. The cursor is resolved in one of three ways:
//!
//! 1. On (or right after) a lexical item whose origin is known: proposals
//!    come from that origin (children of an object, columns of a source,
//!    fields of a composite type, values in scope, ...).
//! 2. On a dotted name the model did not classify: the qualifier is resolved
//!    against the query's sources first, then against the catalog.
//! 3. Anywhere else: the syntax inspection decides what kind of name fits.
//!
//! Keywords predicted by the inspection are added unless the cursor is on a
//! chained name or right after a period.

use std::collections::HashSet;
use std::sync::Arc;

use sql_insight_catalog::{CatalogError, CatalogResult, MetadataProvider};
use sql_insight_ir::{
    CancellationMonitor, CompositeType, DbObject, ObjectKind, ObjectKindSet, Parser, TextRange,
};
use sql_insight_semantic::{
    LexicalItemKind, ModelRecognizer, QueryScopeId, RowsSourceId, ScopeKind, SemanticModel,
    SymbolOrigin,
};
use tracing::{debug, instrument, warn};

use crate::error::{CompletionError, CompletionResult};
use crate::inspection::{Expectation, SyntaxInspection};
use crate::items::{CompletionItem, CompletionItemKind, CompletionSet};
use crate::scoring;
use crate::settings::{AliasPolicy, CompletionSettings};

/// Score added to foreign-key join proposals so they lead the list
const JOIN_BOOST: i32 = 1000;

/// Completion engine bound to one metadata provider
#[derive(Clone)]
pub struct CompletionEngine {
    provider: Arc<dyn MetadataProvider>,
    settings: CompletionSettings,
}

impl CompletionEngine {
    pub fn new(provider: Arc<dyn MetadataProvider>, settings: CompletionSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Locate `offset` inside `model`
    #[instrument(
        skip(self, model, inspection, monitor),
        fields(expectation = ?inspection.expectation)
    )]
    pub fn prepare<'a>(
        &'a self,
        offset: usize,
        model: &'a SemanticModel,
        inspection: SyntaxInspection,
        monitor: &'a dyn CancellationMonitor,
    ) -> CompletionResult<CompletionContext<'a>> {
        if monitor.is_canceled() {
            return Err(CompletionError::Canceled);
        }
        validate_offset(model.source(), offset)?;
        let location = locate(model, offset);
        debug!("Cursor at {}: {:?}", offset, location.anchor);
        Ok(CompletionContext {
            engine: self,
            model,
            inspection,
            monitor,
            offset,
            location,
        })
    }

    /// Recognize `text`, inspect it and propose completions at `offset`
    pub fn complete(
        &self,
        recognizer: &ModelRecognizer,
        parser: &dyn Parser,
        text: &str,
        offset: usize,
        monitor: &dyn CancellationMonitor,
    ) -> CompletionResult<Vec<CompletionSet>> {
        validate_offset(text, offset)?;
        let model = recognizer.recognize(parser, text, monitor)?;
        let inspection = SyntaxInspection::from_text(text, offset, recognizer.settings().dialect);
        let context = self.prepare(offset, &model, inspection, monitor)?;
        context.prepare_proposal(offset)
    }
}

fn validate_offset(source: &str, offset: usize) -> CompletionResult<()> {
    if offset > source.len() || !source.is_char_boundary(offset) {
        return Err(CompletionError::InvalidOffset {
            offset,
            len: source.len(),
        });
    }
    Ok(())
}

/// How the cursor relates to the model
#[derive(Debug, Clone)]
enum Anchor {
    Origin(SymbolOrigin),
    /// Canonical qualifier parts of an unclassified dotted name
    Dotted(Vec<String>),
    Free,
}

#[derive(Debug, Clone)]
struct CursorLocation {
    anchor: Anchor,
    replace: TextRange,
    filter: String,
    after_period: bool,
    query: Option<QueryScopeId>,
    scope: Option<ScopeKind>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '"' || c == '`'
}

/// Start of the name fragment ending at `offset`
fn fragment_start(source: &str, offset: usize) -> usize {
    source[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_name_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset)
}

/// End of the name fragment starting at `offset`
fn fragment_end(source: &str, offset: usize) -> usize {
    source[offset..]
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map(|(i, _)| offset + i)
        .unwrap_or(source.len())
}

fn strip_quote(model: &SemanticModel, fragment: &str) -> String {
    let quotes = model.dialect().identifier_quotes();
    let mut chars = fragment.chars();
    match chars.next() {
        Some(open) if quotes.iter().any(|(o, _)| *o == open) => {
            let close = quotes
                .iter()
                .find(|(o, _)| *o == open)
                .map(|(_, c)| *c)
                .unwrap_or(open);
            let inner = chars.as_str();
            inner.strip_suffix(close).unwrap_or(inner).to_string()
        }
        _ => fragment.to_string(),
    }
}

fn locate(model: &SemanticModel, offset: usize) -> CursorLocation {
    let source = model.source();
    let query = model.query_at(offset);
    let scope = model.lexical().scope_at(offset).map(|s| s.kind);

    if let Some(item) = model.lexical_item_at(offset) {
        let origin = item
            .origin()
            .filter(|origin| !matches!(origin, SymbolOrigin::SyntaxFallback));
        if let Some(origin) = origin {
            let placed = match item.kind {
                LexicalItemKind::Symbol(_) => {
                    let typed = &source[item.range.start..offset.max(item.range.start)];
                    Some((item.range, strip_quote(model, typed), false))
                }
                LexicalItemKind::MemberAccess if offset >= item.range.end => {
                    Some((TextRange::empty(offset), String::new(), true))
                }
                LexicalItemKind::MemberAccess => None,
                LexicalItemKind::TupleReference => Some((item.range, String::new(), false)),
            };
            if let Some((replace, filter, after_period)) = placed {
                return CursorLocation {
                    anchor: Anchor::Origin(origin.clone()),
                    replace,
                    filter,
                    after_period,
                    query: origin.query().or(query),
                    scope,
                };
            }
        }
    }

    let start = fragment_start(source, offset);
    let end = fragment_end(source, offset);
    let mut parts = Vec::new();
    let mut cursor = start;
    while source[..cursor].ends_with('.') {
        let dot = cursor - 1;
        let part_start = fragment_start(source, dot);
        if part_start == dot {
            break;
        }
        parts.push(source[part_start..dot].to_string());
        cursor = part_start;
    }
    parts.reverse();

    let after_period = source[..start].ends_with('.');
    let anchor = if parts.is_empty() {
        Anchor::Free
    } else {
        let dialect = model.dialect();
        Anchor::Dotted(
            parts
                .iter()
                .map(|raw| dialect.canonicalize_identifier(raw).name)
                .collect(),
        )
    };
    CursorLocation {
        anchor,
        replace: TextRange::new(start, end),
        filter: strip_quote(model, &source[start..offset]),
        after_period,
        query,
        scope,
    }
}

/// Sets under construction for one request
struct Proposals {
    sets: Vec<CompletionSet>,
    filter: String,
    search_inside_names: bool,
}

impl Proposals {
    fn new(location: &CursorLocation, settings: &CompletionSettings) -> Self {
        Self {
            sets: vec![CompletionSet::new(location.replace.start, location.replace.len())],
            filter: location.filter.clone(),
            search_inside_names: settings.search_inside_names,
        }
    }

    /// Open another set sharing the replacement range
    fn group(&mut self, title: &str) -> usize {
        let main = &self.sets[0];
        let set = CompletionSet::new(main.replace_start, main.replace_len).with_title(title);
        self.sets.push(set);
        self.sets.len() - 1
    }

    fn offer(&mut self, item: CompletionItem) {
        self.offer_in(0, item, 0);
    }

    /// Score `item` against the filter and keep it when it matches
    fn offer_in(&mut self, set: usize, item: CompletionItem, boost: i32) {
        let score = scoring::score(&item.label, &self.filter, self.search_inside_names);
        if score > 0 {
            self.sets[set].push(item.with_score(score + boost));
        }
    }

    fn finish(self, settings: &CompletionSettings) -> Vec<CompletionSet> {
        self.sets
            .into_iter()
            .filter_map(|mut set| {
                set.finish(settings.sort_by_score, settings.max_items);
                (!set.is_empty()).then_some(set)
            })
            .collect()
    }
}

/// Cursor located in one model, ready to produce proposals
pub struct CompletionContext<'a> {
    engine: &'a CompletionEngine,
    model: &'a SemanticModel,
    inspection: SyntaxInspection,
    monitor: &'a dyn CancellationMonitor,
    offset: usize,
    location: CursorLocation,
}

impl std::fmt::Debug for CompletionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionContext")
            .field("offset", &self.offset)
            .field("inspection", &self.inspection)
            .field("location", &self.location)
            .finish()
    }
}

impl<'a> CompletionContext<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn inspection(&self) -> &SyntaxInspection {
        &self.inspection
    }

    /// Text the proposals replace
    pub fn replace_range(&self) -> TextRange {
        self.location.replace
    }

    /// Typed part of the name under the cursor
    pub fn filter(&self) -> &str {
        &self.location.filter
    }

    /// Proposals for `offset`, normally the offset given to `prepare`
    #[instrument(skip(self), fields(filter = %self.location.filter))]
    pub fn prepare_proposal(&self, offset: usize) -> CompletionResult<Vec<CompletionSet>> {
        self.check()?;
        let relocated;
        let location = if offset == self.offset {
            &self.location
        } else {
            validate_offset(self.model.source(), offset)?;
            relocated = locate(self.model, offset);
            &relocated
        };

        let mut proposals = Proposals::new(location, &self.engine.settings);
        let chained = match &location.anchor {
            Anchor::Origin(origin) => {
                self.propose_for_origin(origin, location, &mut proposals)?;
                origin.is_chained()
            }
            Anchor::Dotted(prefix) => {
                self.propose_dotted(prefix, location, &mut proposals)?;
                true
            }
            Anchor::Free => {
                self.propose_free(location, &mut proposals)?;
                false
            }
        };
        if !chained && !location.after_period {
            self.propose_keywords(&mut proposals);
        }

        let sets = proposals.finish(&self.engine.settings);
        debug!(
            "Proposed {} item(s) in {} set(s)",
            sets.iter().map(|s| s.items.len()).sum::<usize>(),
            sets.len()
        );
        Ok(sets)
    }

    fn check(&self) -> CompletionResult<()> {
        if self.monitor.is_canceled() {
            return Err(CompletionError::Canceled);
        }
        Ok(())
    }

    fn provider(&self) -> &dyn MetadataProvider {
        self.engine.provider.as_ref()
    }

    /// Metadata failures drop the proposals they would have fed
    fn metadata<T>(&self, what: &str, result: CatalogResult<Vec<T>>) -> CompletionResult<Vec<T>> {
        match result {
            Ok(found) => Ok(found),
            Err(CatalogError::Canceled) => Err(CompletionError::Canceled),
            Err(e) => {
                warn!("Metadata lookup for {} failed: {}", what, e);
                Ok(Vec::new())
            }
        }
    }

    fn children(&self, object: &DbObject) -> CompletionResult<Vec<Arc<DbObject>>> {
        self.check()?;
        self.metadata(&object.name, self.provider().children(self.monitor, object))
    }

    fn attributes(&self, object: &DbObject) -> CompletionResult<Vec<Arc<DbObject>>> {
        self.check()?;
        self.metadata(&object.name, self.provider().attributes(self.monitor, object))
    }

    fn default_containers(&self) -> CompletionResult<Vec<Arc<DbObject>>> {
        self.check()?;
        self.metadata("default containers", self.provider().default_containers(self.monitor))
    }

    fn propose_for_origin(
        &self,
        origin: &SymbolOrigin,
        location: &CursorLocation,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        match origin {
            SymbolOrigin::ObjectScope { object, allowed } => {
                self.propose_children(object, *allowed, location.query, proposals)
            }
            SymbolOrigin::ContextScope { query, allowed } => {
                self.propose_in_context(Some(*query), *allowed, proposals)
            }
            SymbolOrigin::ColumnFromSource { source }
            | SymbolOrigin::ColumnNameFromRowsData { source } => {
                self.propose_source_columns(*source, 0, false, proposals)
            }
            SymbolOrigin::MemberOfType { data_type } => {
                self.propose_members(data_type, proposals);
                Ok(())
            }
            SymbolOrigin::RowsSourceRef { query } => {
                self.propose_source_names(*query, proposals);
                if self.provider().is_connected() {
                    self.propose_in_context(Some(*query), ObjectKindSet::ROWS_SOURCES, proposals)?;
                }
                Ok(())
            }
            SymbolOrigin::RowsDataRef { query } => self.propose_values(*query, location, proposals),
            SymbolOrigin::ExpandableTupleRef { query, source } => {
                self.propose_tuple(*query, *source, proposals)
            }
            SymbolOrigin::SyntaxFallback => self.propose_free(location, proposals),
        }
    }

    /// Immediate children of `object` of the allowed kinds
    fn propose_children(
        &self,
        object: &DbObject,
        allowed: ObjectKindSet,
        query: Option<QueryScopeId>,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        for child in self.children(object)? {
            let nested_container = object.kind == ObjectKind::Catalog && child.kind.is_container();
            if allowed.contains(child.kind) || nested_container {
                proposals.offer(self.object_item(child, query));
            }
        }
        Ok(())
    }

    /// Names resolvable without qualification: CTEs, search-path objects and containers
    fn propose_in_context(
        &self,
        query: Option<QueryScopeId>,
        allowed: ObjectKindSet,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        let rows = self.model.rows();
        if let Some(query) = query.filter(|_| allowed.contains(ObjectKind::Table)) {
            let ctes: Vec<RowsSourceId> = rows
                .ancestry(query)
                .flat_map(|q| q.ctes.iter().copied())
                .collect();
            for cte in ctes {
                if let Some(name) = rows.source(cte).name.as_deref() {
                    proposals.offer(
                        CompletionItem::new(name, CompletionItemKind::Table)
                            .with_insert_text(self.model.dialect().quote_if_needed(name))
                            .with_detail("CTE"),
                    );
                }
            }
        }

        let containers = self.default_containers()?;
        for container in &containers {
            self.propose_children(container, allowed, query, proposals)?;
        }
        let mut seen = HashSet::new();
        for container in &containers {
            if seen.insert(container.qualified_name()) {
                proposals.offer(self.object_item(container.clone(), query));
            }
            if let Some(parent) = &container.parent {
                for sibling in self.children(parent)? {
                    if sibling.kind.is_container() && seen.insert(sibling.qualified_name()) {
                        proposals.offer(self.object_item(sibling, query));
                    }
                }
            }
        }
        Ok(())
    }

    /// Columns of one rows source into set `set`
    fn propose_source_columns(
        &self,
        id: RowsSourceId,
        set: usize,
        describe_source: bool,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        let source = self.model.rows().source(id);
        let kind = if source.is_derived() {
            CompletionItemKind::ColumnDerived
        } else {
            CompletionItemKind::Column
        };
        let owner = source.reference_name().filter(|_| describe_source);
        let dialect = self.model.dialect();

        let mut items = Vec::new();
        match source.table() {
            Some(table) if !source.columns_known => {
                for attribute in self.attributes(table)? {
                    items.push(CompletionItem::for_object(attribute));
                }
            }
            _ => {
                for column in &source.columns {
                    let item = match &column.object {
                        Some(object) => CompletionItem::for_object(object.clone()),
                        None => {
                            let item = CompletionItem::new(column.name.clone(), kind);
                            match &column.data_type {
                                Some(data_type) => item.with_detail(data_type.to_string()),
                                None => item,
                            }
                        }
                    };
                    items.push(item);
                }
            }
        }

        for mut item in items {
            item.kind = kind;
            item.insert_text = dialect.quote_if_needed(&item.label);
            if let Some(owner) = &owner {
                let detail = match &item.detail {
                    Some(detail) => format!("{} ({})", detail, owner),
                    None => owner.clone(),
                };
                item.detail = Some(detail);
            }
            proposals.offer_in(set, item, 0);
        }
        Ok(())
    }

    fn propose_members(&self, data_type: &CompositeType, proposals: &mut Proposals) {
        let dialect = self.model.dialect();
        for field in &data_type.fields {
            proposals.offer(
                CompletionItem::new(field.name.clone(), CompletionItemKind::Field)
                    .with_insert_text(dialect.quote_if_needed(&field.name))
                    .with_detail(format!("{}.{}", data_type.name, field.data_type)),
            );
        }
    }

    /// Aliases and table names introduced by the visible FROM clauses
    fn propose_source_names(&self, query: QueryScopeId, proposals: &mut Proposals) {
        let rows = self.model.rows();
        for id in rows.visible_sources(query).into_iter().flatten() {
            let source = rows.source(id);
            let Some(name) = source.reference_name() else {
                continue;
            };
            let kind = if source.alias.is_some() {
                CompletionItemKind::TableAlias
            } else {
                CompletionItemKind::Table
            };
            let mut item = CompletionItem::new(name.clone(), kind)
                .with_insert_text(self.model.dialect().quote_if_needed(&name));
            if let Some(table) = source.table() {
                item = item.with_detail(table.qualified_name());
            }
            proposals.offer(item);
        }
    }

    /// Everything usable as a value: columns, source names, routines, variables
    fn propose_values(
        &self,
        query: QueryScopeId,
        location: &CursorLocation,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        let rows = self.model.rows();
        let levels = rows.visible_sources(query);
        let several = levels.iter().map(Vec::len).sum::<usize>() > 1;
        for id in levels.iter().flatten() {
            self.propose_source_columns(*id, 0, several, proposals)?;
        }
        self.propose_source_names(query, proposals);

        if location.scope == Some(ScopeKind::OrderBy) {
            for column in &rows.query(query).result {
                if !column.name.is_empty() {
                    proposals.offer(
                        CompletionItem::new(column.name.clone(), CompletionItemKind::ColumnDerived)
                            .with_detail("result column"),
                    );
                }
            }
        }

        self.propose_routines(proposals)?;

        let dialect = self.model.dialect();
        for variable in dialect.global_variables() {
            proposals.offer(
                CompletionItem::new(variable.name, CompletionItemKind::Variable)
                    .with_detail(variable.description),
            );
        }

        let join_position = location.scope == Some(ScopeKind::JoinCondition)
            || self.inspection.expectation == Expectation::JoinCondition;
        if join_position && self.engine.settings.propose_join_conditions {
            self.propose_joins(query, proposals)?;
        }
        Ok(())
    }

    /// Catalog routines on the search path plus the dialect's built-ins
    fn propose_routines(&self, proposals: &mut Proposals) -> CompletionResult<()> {
        for container in self.default_containers()? {
            for child in self.children(&container)? {
                if child.kind == ObjectKind::Function {
                    proposals.offer(self.object_item(child, None));
                }
            }
        }
        for name in self.model.dialect().builtin_functions() {
            proposals.offer(
                CompletionItem::new(*name, CompletionItemKind::Function).with_detail("built-in"),
            );
        }
        Ok(())
    }

    /// `new.fk = old.pk` predicates between the newest source and earlier ones
    fn propose_joins(
        &self,
        query: QueryScopeId,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        let rows = self.model.rows();
        let tables: Vec<(String, &Arc<DbObject>)> = rows
            .query(query)
            .sources
            .iter()
            .map(|id| rows.source(*id))
            .filter_map(|source| Some((source.reference_name()?, source.table()?)))
            .collect();
        let Some(((newest_name, newest), earlier)) = tables.split_last() else {
            return Ok(());
        };

        self.check()?;
        let outgoing = self.metadata(
            &newest.name,
            self.provider().associations(self.monitor, newest),
        )?;
        for key in &outgoing {
            for (name, table) in earlier {
                if same_object(&key.target, table) {
                    let item = self.join_item(
                        newest_name,
                        &key.source_columns,
                        name,
                        &key.target_columns,
                        &key.name,
                    );
                    proposals.offer_in(0, item, JOIN_BOOST);
                }
            }
        }

        for (name, table) in earlier {
            self.check()?;
            let incoming =
                self.metadata(&table.name, self.provider().associations(self.monitor, table))?;
            for key in incoming.iter().filter(|key| same_object(&key.target, newest)) {
                let item = self.join_item(
                    newest_name,
                    &key.target_columns,
                    name,
                    &key.source_columns,
                    &key.name,
                );
                proposals.offer_in(0, item, JOIN_BOOST);
            }
        }
        Ok(())
    }

    fn join_item(
        &self,
        left: &str,
        left_columns: &[String],
        right: &str,
        right_columns: &[String],
        key: &str,
    ) -> CompletionItem {
        let dialect = self.model.dialect();
        let predicate = left_columns
            .iter()
            .zip(right_columns)
            .map(|(l, r)| {
                format!(
                    "{}.{} = {}.{}",
                    dialect.quote_if_needed(left),
                    dialect.quote_if_needed(l),
                    dialect.quote_if_needed(right),
                    dialect.quote_if_needed(r)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        CompletionItem::new(predicate, CompletionItemKind::JoinCondition)
            .with_detail(format!("foreign key {}", key))
    }

    /// Explicit column list standing for `*` or `t.*`
    fn propose_tuple(
        &self,
        query: QueryScopeId,
        source: Option<RowsSourceId>,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        let rows = self.model.rows();
        let sources = match source {
            Some(source) => vec![source],
            None => rows.query(query).sources.clone(),
        };
        let source_given = source.is_some();
        let qualify = sources.len() > 1 || source_given;
        let dialect = self.model.dialect();

        let mut columns = Vec::new();
        for id in sources {
            let source = rows.source(id);
            let names: Vec<String> = match source.table() {
                Some(table) if !source.columns_known => self
                    .attributes(table)?
                    .iter()
                    .map(|attribute| attribute.name.clone())
                    .collect(),
                _ => source.columns.iter().map(|c| c.name.clone()).collect(),
            };
            let owner = source.reference_name().filter(|_| qualify);
            for name in names {
                let column = dialect.quote_if_needed(&name);
                // `t.*` keeps its own qualifier on the first column
                let explicit = source_given && columns.is_empty();
                columns.push(match &owner {
                    Some(owner) if !explicit => {
                        format!("{}.{}", dialect.quote_if_needed(owner), column)
                    }
                    _ => column,
                });
            }
        }
        if !columns.is_empty() {
            proposals.offer(
                CompletionItem::new(columns.join(", "), CompletionItemKind::Tuple)
                    .with_detail("expand columns"),
            );
        }
        Ok(())
    }

    /// Unclassified `a.b.|`: sources of the query first, then the catalog
    fn propose_dotted(
        &self,
        prefix: &[String],
        location: &CursorLocation,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        if let Some(query) = location.query {
            let rows = self.model.rows();
            let mut by_alias = Vec::new();
            let mut by_name = Vec::new();
            for level in rows.visible_sources(query) {
                for id in level {
                    if rows.source_matches(id, prefix) {
                        if rows.source(id).alias.is_some() {
                            by_alias.push(id);
                        } else {
                            by_name.push(id);
                        }
                    }
                }
                if !by_alias.is_empty() || !by_name.is_empty() {
                    break;
                }
            }
            if !by_alias.is_empty() {
                let set = proposals.group("alias");
                for id in &by_alias {
                    self.propose_source_columns(*id, set, false, proposals)?;
                }
            }
            if !by_name.is_empty() {
                let set = proposals.group("table");
                for id in &by_name {
                    self.propose_source_columns(*id, set, false, proposals)?;
                }
            }
            if !by_alias.is_empty() || !by_name.is_empty() {
                return Ok(());
            }
        }

        let children_allowed = match self.inspection.expectation {
            Expectation::TableReference => ObjectKindSet::ROWS_SOURCES,
            Expectation::ObjectName(allowed) => allowed,
            Expectation::ColumnReference | Expectation::JoinCondition => {
                ObjectKindSet::ROWS_SOURCES.union(ObjectKindSet::ROUTINES)
            }
            _ => ObjectKindSet::ALL,
        };
        self.check()?;
        let found = self.metadata(
            &prefix.join("."),
            self.provider().find_real_objects(
                self.monitor,
                ObjectKindSet::CONTAINERS.union(ObjectKindSet::ROWS_SOURCES),
                prefix,
            ),
        )?;
        for object in found {
            if object.kind.is_container() {
                self.propose_children(&object, children_allowed, location.query, proposals)?;
            } else {
                for attribute in self.attributes(&object)? {
                    proposals.offer(self.object_item(attribute, location.query));
                }
            }
        }
        Ok(())
    }

    /// No anchored name: propose by what the grammar expects
    fn propose_free(
        &self,
        location: &CursorLocation,
        proposals: &mut Proposals,
    ) -> CompletionResult<()> {
        match self.inspection.expectation {
            Expectation::TableReference => {
                self.propose_in_context(location.query, ObjectKindSet::ROWS_SOURCES, proposals)
            }
            Expectation::ColumnReference | Expectation::JoinCondition => match location.query {
                Some(query) => self.propose_values(query, location, proposals),
                None => Ok(()),
            },
            Expectation::ObjectName(allowed) => {
                self.propose_in_context(location.query, allowed, proposals)
            }
            Expectation::StatementStart | Expectation::Keyword | Expectation::Unknown => Ok(()),
        }
    }

    fn propose_keywords(&self, proposals: &mut Proposals) {
        let case = self.engine.settings.keyword_case;
        for keyword in &self.inspection.keywords {
            let text = case.apply(keyword);
            proposals.offer(CompletionItem::new(text, CompletionItemKind::Keyword));
        }
    }

    /// Item for a catalog object, spelled so it resolves back to the object
    fn object_item(&self, object: Arc<DbObject>, query: Option<QueryScopeId>) -> CompletionItem {
        let mut insert = object.quoted_identifier(self.model.dialect());
        if let Some(alias) = self.alias_for(&object, query) {
            insert = format!("{} {}", insert, alias);
        }
        CompletionItem::for_object(object).with_insert_text(insert)
    }

    /// Alias appended to a table inserted in FROM position
    fn alias_for(&self, object: &DbObject, query: Option<QueryScopeId>) -> Option<String> {
        let wanted = self.engine.settings.insert_table_alias == AliasPolicy::FirstLetter
            && object.kind.is_rows_source()
            && self.inspection.expectation == Expectation::TableReference;
        if !wanted {
            return None;
        }
        let first = object.name.chars().next().filter(|c| c.is_alphabetic())?;
        let base: String = first.to_lowercase().collect();

        let rows = self.model.rows();
        let taken: HashSet<String> = query
            .map(|query| {
                rows.visible_sources(query)
                    .into_iter()
                    .flatten()
                    .filter_map(|id| rows.source(id).reference_name())
                    .collect()
            })
            .unwrap_or_default();
        let dialect = self.model.dialect();
        let mut candidate = base.clone();
        let mut counter = 1;
        while taken.contains(&candidate) || dialect.is_reserved(&candidate) {
            candidate = format!("{}{}", base, counter);
            counter += 1;
        }
        Some(candidate)
    }
}

fn same_object(a: &DbObject, b: &DbObject) -> bool {
    a.kind == b.kind && a.qualified_name() == b.qualified_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_bounds() {
        let text = "SELECT u.na FROM users u";
        assert_eq!(fragment_start(text, 11), 9);
        assert_eq!(fragment_end(text, 10), 11);
        assert_eq!(fragment_start(text, 9), 9);
        assert_eq!(fragment_start(text, 0), 0);
        assert_eq!(fragment_end(text, text.len()), text.len());
    }

    #[test]
    fn test_offset_validation() {
        assert!(validate_offset("SELECT", 6).is_ok());
        assert!(matches!(
            validate_offset("SELECT", 7),
            Err(CompletionError::InvalidOffset { offset: 7, len: 6 })
        ));
        assert!(validate_offset("é", 1).is_err());
    }

    #[test]
    fn test_same_object_compares_paths() {
        let public = Arc::new(DbObject::new("public", ObjectKind::Schema));
        let archive = Arc::new(DbObject::new("archive", ObjectKind::Schema));
        let a = DbObject::new("users", ObjectKind::Table).with_parent(public.clone());
        let b = DbObject::new("users", ObjectKind::Table).with_parent(public);
        let c = DbObject::new("users", ObjectKind::Table).with_parent(archive);
        assert!(same_object(&a, &b));
        assert!(!same_object(&a, &c));
    }
}

// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Tolerant SQL parser for tests
//!
//! Covers the statement shapes the recognizer models (SELECT with CTEs, joins,
//! derived tables and set operations, INSERT/UPDATE/DELETE, CREATE/ALTER
//! TABLE, DROP, CALL) and produces the node-kind vocabulary directly. It never
//! fails: tokens it cannot place end up in `Error` nodes, and incomplete input
//! such as `SELECT u. FROM users u` keeps the shape an editor needs.

use sql_insight_ir::{NodeKind, Parser, SyntaxTree, TextRange};
use tracing::trace;

use crate::mock_tree::{MockNode, build_tree};

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CALL", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "ELSE", "END", "EXCEPT", "EXISTS", "FOREIGN", "FROM", "FULL", "FUNCTION", "GROUP", "HAVING",
    "IF", "ILIKE", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT",
    "LIKE", "LIMIT", "NOT", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "PROCEDURE",
    "REFERENCES", "RENAME", "RIGHT", "ROUTINE", "SCHEMA", "SELECT", "SEQUENCE", "SET", "TABLE",
    "THEN", "TO", "UNION", "UNIQUE", "UPDATE", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

const LITERAL_WORDS: &[&str] = &["TRUE", "FALSE", "NULL"];

/// Keywords that end an expression list
const CLAUSE_KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "UNION", "INTERSECT",
    "EXCEPT", "ON", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "SET", "VALUES", "AS",
    "ASC", "DESC", "WHEN", "THEN", "ELSE", "END", "AND", "OR",
];

const JOIN_KEYWORDS: &[&str] = &["JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS"];

const COMPARISON_OPERATORS: &[&str] = &["=", "<>", "!=", "<", ">", "<=", ">="];

#[derive(Debug, Clone)]
struct Token {
    kind: NodeKind,
    range: TextRange,
    /// Upper-cased text (keywords are compared through it)
    upper: String,
}

/// Parser producing trees for the recognizer and completion tests
#[derive(Debug, Clone, Copy, Default)]
pub struct TestSqlParser;

impl TestSqlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text`, never failing
    pub fn parse_text(&self, text: &str) -> SyntaxTree {
        let tokens = tokenize(text);
        trace!("Tokenized {} tokens", tokens.len());
        let mut parser = SqlParser { tokens, pos: 0 };
        let root = parser.parse_root();
        build_tree(text, &root)
    }
}

impl Parser for TestSqlParser {
    fn parse(&self, text: &str) -> Option<SyntaxTree> {
        Some(self.parse_text(text))
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn scan_word(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_word_byte(bytes[i]) {
        i += 1;
    }
    i
}

/// End of a quoted token starting at `i`; doubled quotes stay inside
fn scan_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    i += 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}

fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    i
}

fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let kind = match b {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'-' if next == Some(b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'\'' => {
                i = scan_quoted(bytes, i, b'\'');
                NodeKind::StringLiteral
            }
            b'"' | b'`' => {
                i = scan_quoted(bytes, i, b);
                NodeKind::QuotedIdentifier
            }
            b'.' => {
                i += 1;
                NodeKind::Period
            }
            b',' => {
                i += 1;
                NodeKind::Comma
            }
            b'*' => {
                i += 1;
                NodeKind::Asterisk
            }
            b'(' => {
                i += 1;
                NodeKind::LeftParen
            }
            b')' => {
                i += 1;
                NodeKind::RightParen
            }
            b';' => {
                i += 1;
                NodeKind::Semicolon
            }
            b'@' => {
                i = scan_word(bytes, i + 1);
                NodeKind::BatchVariable
            }
            b':' if next.is_some_and(is_word_start) => {
                i = scan_word(bytes, i + 1);
                NodeKind::ExternalParameter
            }
            b'?' => {
                i += 1;
                NodeKind::ExternalParameter
            }
            b'$' if next == Some(b'{') => {
                while i < bytes.len() && bytes[i] != b'}' {
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                NodeKind::ExternalVariable
            }
            b'$' if next.is_some_and(|n| n.is_ascii_digit()) => {
                i = scan_number(bytes, i + 1);
                NodeKind::ExternalParameter
            }
            b'0'..=b'9' => {
                i = scan_number(bytes, i);
                NodeKind::Literal
            }
            b if is_word_start(b) => {
                i = scan_word(bytes, i);
                let upper = text[start..i].to_ascii_uppercase();
                if LITERAL_WORDS.contains(&upper.as_str()) {
                    NodeKind::Literal
                } else if KEYWORDS.contains(&upper.as_str()) {
                    NodeKind::Keyword
                } else {
                    NodeKind::Identifier
                }
            }
            _ => {
                let pair = text.get(i..i + 2).unwrap_or("");
                i += if ["<=", ">=", "<>", "!=", "||", "::"].contains(&pair) {
                    2
                } else {
                    1
                };
                NodeKind::Operator
            }
        };
        tokens.push(Token {
            kind,
            range: TextRange::new(start, i),
            upper: text[start..i].to_ascii_uppercase(),
        });
    }
    tokens
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct SqlParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl SqlParser {
    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at(&self, kind: NodeKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == NodeKind::Keyword && t.upper == keyword)
    }

    fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == NodeKind::Keyword && keywords.contains(&t.upper.as_str()))
    }

    fn nth_is_keyword(&self, n: usize, keywords: &[&str]) -> bool {
        self.peek_nth(n)
            .is_some_and(|t| t.kind == NodeKind::Keyword && keywords.contains(&t.upper.as_str()))
    }

    fn at_name(&self) -> bool {
        self.peek()
            .is_some_and(|t| matches!(t.kind, NodeKind::Identifier | NodeKind::QuotedIdentifier))
    }

    fn at_operator(&self, operators: &[&str]) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == NodeKind::Operator && operators.contains(&t.upper.as_str()))
    }

    /// `(` followed by a query
    fn at_subquery(&self) -> bool {
        self.at(NodeKind::LeftParen) && self.nth_is_keyword(1, &["SELECT", "WITH"])
    }

    /// Token ending the current expression or list
    fn at_stop(&self) -> bool {
        match self.peek() {
            None => true,
            Some(t) => {
                matches!(t.kind, NodeKind::RightParen | NodeKind::Semicolon | NodeKind::Comma)
                    || (t.kind == NodeKind::Keyword && CLAUSE_KEYWORDS.contains(&t.upper.as_str()))
            }
        }
    }

    fn bump(&mut self) -> MockNode {
        self.bump_as(None)
    }

    /// Consume the current token, optionally overriding its kind
    fn bump_as(&mut self, kind: Option<NodeKind>) -> MockNode {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                MockNode::token(kind.unwrap_or(token.kind), token.range)
            }
            None => MockNode::node(NodeKind::Error, Vec::new()),
        }
    }

    fn eat(&mut self, kind: NodeKind, out: &mut Vec<MockNode>) -> bool {
        if self.at(kind) {
            out.push(self.bump());
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str, out: &mut Vec<MockNode>) -> bool {
        if self.at_keyword(keyword) {
            out.push(self.bump());
            true
        } else {
            false
        }
    }

    /// Consume any run of the given keywords
    fn eat_keywords(&mut self, keywords: &[&str], out: &mut Vec<MockNode>) {
        while self.at_any_keyword(keywords) {
            out.push(self.bump());
        }
    }

    /// Tokens up to the next `,` or unbalanced `)` (or `;`)
    fn skip_balanced(&mut self, out: &mut Vec<MockNode>) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                NodeKind::LeftParen => depth += 1,
                NodeKind::RightParen if depth == 0 => break,
                NodeKind::RightParen => depth -= 1,
                NodeKind::Comma | NodeKind::Semicolon if depth == 0 => break,
                _ => {}
            }
            out.push(self.bump());
        }
    }

    /// Wrap tokens up to the next stop token in an `Error` node
    fn recover(&mut self, out: &mut Vec<MockNode>, stop: impl Fn(&Self) -> bool) {
        let mut garbage = Vec::new();
        while !self.at_end() && !stop(&*self) {
            garbage.push(self.bump());
        }
        if !garbage.is_empty() {
            out.push(MockNode::node(NodeKind::Error, garbage));
        }
    }

    // ---- statements ----

    fn parse_root(&mut self) -> MockNode {
        let mut children = Vec::new();
        if let Some(statement) = self.parse_statement() {
            children.push(statement);
        }
        self.eat(NodeKind::Semicolon, &mut children);
        self.recover(&mut children, |_| false);
        MockNode::node(NodeKind::Root, children)
    }

    fn parse_statement(&mut self) -> Option<MockNode> {
        let token = self.peek()?;
        if token.kind != NodeKind::Keyword {
            return None;
        }
        let keyword = token.upper.clone();
        let statement = match keyword.as_str() {
            "SELECT" | "WITH" => self.parse_query(),
            "INSERT" => self.parse_insert(),
            "UPDATE" => self.parse_update(),
            "DELETE" => self.parse_delete(),
            "CREATE" if self.nth_is_keyword(1, &["TABLE"]) => self.parse_create_table(),
            "ALTER" if self.nth_is_keyword(1, &["TABLE"]) => self.parse_alter_table(),
            "DROP" => self.parse_drop(),
            "CALL" => {
                let mut children = vec![self.bump()];
                if self.at_name() {
                    children.push(self.parse_name_expression());
                }
                MockNode::node(NodeKind::CallStatement, children)
            }
            _ => return None,
        };
        Some(statement)
    }

    /// SELECT, possibly combined by set operators
    fn parse_query(&mut self) -> MockNode {
        let mut left = self.parse_select();
        while self.at_any_keyword(&["UNION", "INTERSECT", "EXCEPT"]) {
            let mut children = vec![left, self.bump()];
            self.eat_keywords(&["ALL", "DISTINCT"], &mut children);
            if self.at_any_keyword(&["SELECT", "WITH"]) {
                children.push(self.parse_select());
            }
            left = MockNode::node(NodeKind::SetOperation, children);
        }
        left
    }

    fn parse_select(&mut self) -> MockNode {
        let mut children = Vec::new();
        if self.at_keyword("WITH") {
            children.push(self.parse_with());
        }
        self.eat_keyword("SELECT", &mut children);
        self.eat_keywords(&["DISTINCT", "ALL"], &mut children);
        children.push(self.parse_select_list());

        if self.at_keyword("FROM") {
            children.push(self.parse_from());
        }
        if self.at_keyword("WHERE") {
            children.push(self.parse_simple_clause(NodeKind::WhereClause));
        }
        if self.at_keyword("GROUP") {
            let mut group = vec![self.bump()];
            self.eat_keyword("BY", &mut group);
            self.parse_expression_list(&mut group);
            children.push(MockNode::node(NodeKind::GroupByClause, group));
        }
        if self.at_keyword("HAVING") {
            children.push(self.parse_simple_clause(NodeKind::HavingClause));
        }
        if self.at_keyword("ORDER") {
            children.push(self.parse_order_by());
        }
        for keyword in ["LIMIT", "OFFSET"] {
            if self.eat_keyword(keyword, &mut children) && !self.at_stop() {
                children.push(self.parse_expr());
            }
        }
        self.recover(&mut children, |p| {
            p.at(NodeKind::RightParen)
                || p.at(NodeKind::Semicolon)
                || p.at_any_keyword(&["UNION", "INTERSECT", "EXCEPT"])
        });
        MockNode::node(NodeKind::SelectStatement, children)
    }

    fn parse_with(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        while self.at_name() {
            let mut cte = vec![self.bump()];
            if self.at(NodeKind::LeftParen) {
                cte.push(self.parse_name_list(None));
            }
            self.eat_keyword("AS", &mut cte);
            if self.at_subquery() {
                cte.push(self.bump());
                cte.push(self.parse_query());
                self.eat(NodeKind::RightParen, &mut cte);
            }
            children.push(MockNode::node(NodeKind::CommonTableExpression, cte));
            if !self.eat(NodeKind::Comma, &mut children) {
                break;
            }
        }
        MockNode::node(NodeKind::WithClause, children)
    }

    fn parse_select_list(&mut self) -> MockNode {
        let mut items = Vec::new();
        loop {
            if self.at_end()
                || self.at(NodeKind::RightParen)
                || self.at(NodeKind::Semicolon)
                || (self.at_stop() && !self.at(NodeKind::Comma))
            {
                break;
            }
            items.push(self.parse_select_item());
            if !self.eat(NodeKind::Comma, &mut items) {
                break;
            }
        }
        MockNode::node(NodeKind::SelectList, items)
    }

    fn parse_select_item(&mut self) -> MockNode {
        let mut children = Vec::new();
        if self.at(NodeKind::Asterisk) {
            children.push(self.bump());
        } else {
            children.push(self.parse_expr());
        }
        if self.at_keyword("AS") {
            let mut alias = vec![self.bump()];
            if self.at_name() {
                alias.push(self.bump());
            }
            children.push(MockNode::node(NodeKind::Alias, alias));
        } else if self.at_name() {
            children.push(MockNode::node(NodeKind::Alias, vec![self.bump()]));
        }
        MockNode::node(NodeKind::SelectItem, children)
    }

    fn parse_from(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        while let Some(table) = self.parse_table_expression() {
            children.push(table);
            if !self.eat(NodeKind::Comma, &mut children) {
                break;
            }
        }
        MockNode::node(NodeKind::FromClause, children)
    }

    fn parse_table_expression(&mut self) -> Option<MockNode> {
        let mut left = self.parse_table_primary()?;
        while self.at_any_keyword(JOIN_KEYWORDS) {
            let mut children = vec![left];
            self.eat_keywords(
                &["INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "JOIN"],
                &mut children,
            );
            if let Some(right) = self.parse_table_primary() {
                children.push(right);
            }
            if self.at_keyword("ON") {
                let mut condition = vec![self.bump()];
                if !self.at_stop() {
                    condition.push(self.parse_expr());
                }
                children.push(MockNode::node(NodeKind::JoinCondition, condition));
            }
            left = MockNode::node(NodeKind::JoinedTable, children);
        }
        Some(left)
    }

    fn parse_table_primary(&mut self) -> Option<MockNode> {
        if self.at_subquery() {
            let mut children = vec![self.bump(), self.parse_query()];
            self.eat(NodeKind::RightParen, &mut children);
            self.parse_correlation(&mut children);
            return Some(MockNode::node(NodeKind::DerivedTable, children));
        }
        if !self.at_name() {
            return None;
        }
        let mut children = vec![self.parse_dotted(NodeKind::TableName)];
        self.parse_correlation(&mut children);
        Some(MockNode::node(NodeKind::TableReference, children))
    }

    fn parse_correlation(&mut self, out: &mut Vec<MockNode>) {
        self.eat_keyword("AS", out);
        if self.at_name() {
            out.push(MockNode::node(NodeKind::CorrelationName, vec![self.bump()]));
        }
    }

    /// `keyword expr`
    fn parse_simple_clause(&mut self, kind: NodeKind) -> MockNode {
        let mut children = vec![self.bump()];
        if !self.at_stop() {
            children.push(self.parse_expr());
        }
        MockNode::node(kind, children)
    }

    fn parse_order_by(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        self.eat_keyword("BY", &mut children);
        loop {
            if self.at_stop() && !self.at(NodeKind::Comma) {
                break;
            }
            let mut item = Vec::new();
            if !self.at(NodeKind::Comma) {
                item.push(self.parse_expr());
            }
            self.eat_keywords(&["ASC", "DESC"], &mut item);
            children.push(MockNode::node(NodeKind::OrderItem, item));
            if !self.eat(NodeKind::Comma, &mut children) {
                break;
            }
        }
        MockNode::node(NodeKind::OrderByClause, children)
    }

    fn parse_expression_list(&mut self, out: &mut Vec<MockNode>) {
        loop {
            if self.at_stop() && !self.at(NodeKind::Comma) {
                break;
            }
            if !self.at(NodeKind::Comma) {
                out.push(self.parse_expr());
            }
            if !self.eat(NodeKind::Comma, out) {
                break;
            }
        }
    }

    /// `(a, b, c)` as a column list of `item` nodes (bare identifiers when `None`)
    fn parse_name_list(&mut self, item: Option<NodeKind>) -> MockNode {
        let mut children = vec![self.bump()];
        while self.at_name() {
            let name = self.bump();
            children.push(match item {
                Some(kind) => MockNode::node(kind, vec![name]),
                None => name,
            });
            if !self.eat(NodeKind::Comma, &mut children) {
                break;
            }
        }
        self.recover(&mut children, |p| p.at(NodeKind::RightParen));
        self.eat(NodeKind::RightParen, &mut children);
        MockNode::node(NodeKind::ColumnList, children)
    }

    fn parse_insert(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        self.eat_keyword("INTO", &mut children);
        if self.at_name() {
            children.push(self.parse_dotted(NodeKind::TableName));
        }
        if self.at(NodeKind::LeftParen) && !self.at_subquery() {
            children.push(self.parse_name_list(Some(NodeKind::ColumnName)));
        }
        if self.at_keyword("VALUES") {
            let mut values = vec![self.bump()];
            while self.at(NodeKind::LeftParen) {
                let mut row = vec![self.bump()];
                self.parse_expression_list(&mut row);
                self.eat(NodeKind::RightParen, &mut row);
                values.push(MockNode::node(NodeKind::ValuesRow, row));
                if !self.eat(NodeKind::Comma, &mut values) {
                    break;
                }
            }
            children.push(MockNode::node(NodeKind::ValuesClause, values));
        } else if self.at_any_keyword(&["SELECT", "WITH"]) {
            children.push(self.parse_query());
        }
        MockNode::node(NodeKind::InsertStatement, children)
    }

    fn parse_update(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        if let Some(target) = self.parse_table_primary() {
            children.push(target);
        }
        if self.at_keyword("SET") {
            let mut set = vec![self.bump()];
            while self.at_name() {
                let mut assignment = vec![self.parse_dotted(NodeKind::ColumnName)];
                if self.at_operator(&["="]) {
                    assignment.push(self.bump());
                    if !self.at_stop() {
                        assignment.push(self.parse_expr());
                    }
                }
                set.push(MockNode::node(NodeKind::Assignment, assignment));
                if !self.eat(NodeKind::Comma, &mut set) {
                    break;
                }
            }
            children.push(MockNode::node(NodeKind::SetClause, set));
        }
        if self.at_keyword("FROM") {
            children.push(self.parse_from());
        }
        if self.at_keyword("WHERE") {
            children.push(self.parse_simple_clause(NodeKind::WhereClause));
        }
        MockNode::node(NodeKind::UpdateStatement, children)
    }

    fn parse_delete(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        self.eat_keyword("FROM", &mut children);
        if let Some(target) = self.parse_table_primary() {
            children.push(target);
        }
        if self.at_keyword("WHERE") {
            children.push(self.parse_simple_clause(NodeKind::WhereClause));
        }
        MockNode::node(NodeKind::DeleteStatement, children)
    }

    fn parse_create_table(&mut self) -> MockNode {
        let mut children = vec![self.bump(), self.bump()];
        self.eat_keywords(&["IF", "NOT", "EXISTS"], &mut children);
        if self.at_name() {
            children.push(self.parse_dotted(NodeKind::TableName));
        }
        if self.eat(NodeKind::LeftParen, &mut children) {
            while !self.at_end() && !self.at(NodeKind::RightParen) {
                if self.at_name() {
                    children.push(self.parse_column_definition());
                } else {
                    let mut constraint = Vec::new();
                    self.skip_balanced(&mut constraint);
                    children.push(MockNode::node(NodeKind::Unknown, constraint));
                }
                if !self.eat(NodeKind::Comma, &mut children) {
                    break;
                }
            }
            self.eat(NodeKind::RightParen, &mut children);
        }
        MockNode::node(NodeKind::CreateTableStatement, children)
    }

    /// `name type[(n)] [constraints]`
    fn parse_column_definition(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        if self.at_name() || self.at(NodeKind::Keyword) {
            let mut data_type = vec![self.bump_as(Some(NodeKind::Identifier))];
            if self.at(NodeKind::LeftParen) {
                data_type.push(self.bump());
                self.skip_balanced(&mut data_type);
                self.eat(NodeKind::RightParen, &mut data_type);
            }
            children.push(MockNode::node(NodeKind::DataTypeName, data_type));
        }
        self.skip_balanced(&mut children);
        MockNode::node(NodeKind::ColumnDefinition, children)
    }

    fn parse_alter_table(&mut self) -> MockNode {
        let mut children = vec![self.bump(), self.bump()];
        if self.at_name() {
            children.push(self.parse_dotted(NodeKind::TableName));
        }
        while !self.at_end() && !self.at(NodeKind::Semicolon) {
            let mut action = Vec::new();
            if self.eat_keyword("ADD", &mut action) {
                self.eat_keyword("COLUMN", &mut action);
                if self.at_name() {
                    action.push(self.parse_column_definition());
                }
            } else if self.eat_keyword("DROP", &mut action) {
                self.eat_keyword("COLUMN", &mut action);
                if self.at_name() {
                    action.push(self.parse_dotted(NodeKind::ColumnName));
                }
            } else if self.eat_keyword("RENAME", &mut action) {
                self.eat_keyword("COLUMN", &mut action);
                if self.at_name() {
                    action.push(self.parse_dotted(NodeKind::ColumnName));
                }
                self.eat_keyword("TO", &mut action);
                if self.at_name() {
                    action.push(self.bump());
                }
            }
            self.skip_balanced(&mut action);
            children.push(MockNode::node(NodeKind::AlterAction, action));
            if !self.eat(NodeKind::Comma, &mut children) {
                break;
            }
        }
        MockNode::node(NodeKind::AlterTableStatement, children)
    }

    fn parse_drop(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        if self.at_end() {
            return MockNode::node(NodeKind::DropStatement, children);
        }
        // The object kind is a keyword even when the tokenizer does not know it
        let table_like = self.at_any_keyword(&["TABLE", "VIEW"]);
        children.push(self.bump_as(Some(NodeKind::Keyword)));
        self.eat_keywords(&["IF", "EXISTS"], &mut children);
        let name_kind = if table_like {
            NodeKind::TableName
        } else {
            NodeKind::QualifiedName
        };
        while self.at_name() {
            children.push(self.parse_dotted(name_kind));
            if self.at(NodeKind::LeftParen) {
                let mut signature = vec![self.bump()];
                self.skip_balanced(&mut signature);
                while self.eat(NodeKind::Comma, &mut signature) {
                    self.skip_balanced(&mut signature);
                }
                self.eat(NodeKind::RightParen, &mut signature);
                children.push(MockNode::node(NodeKind::Unknown, signature));
            }
            if !self.eat(NodeKind::Comma, &mut children) {
                break;
            }
        }
        MockNode::node(NodeKind::DropStatement, children)
    }

    /// `a.b.c` as a `kind` node; a trailing period is kept
    fn parse_dotted(&mut self, kind: NodeKind) -> MockNode {
        let mut children = vec![self.bump()];
        while self.at(NodeKind::Period) {
            children.push(self.bump());
            if !self.at_name() {
                break;
            }
            children.push(self.bump());
        }
        MockNode::node(kind, children)
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> MockNode {
        let mut left = self.parse_and();
        while self.at_keyword("OR") {
            let op = self.bump();
            let right = self.parse_operand(Self::parse_and);
            left = MockNode::node(NodeKind::BinaryExpression, vec![left, op, right]);
        }
        left
    }

    fn parse_and(&mut self) -> MockNode {
        let mut left = self.parse_not();
        while self.at_keyword("AND") {
            let op = self.bump();
            let right = self.parse_operand(Self::parse_not);
            left = MockNode::node(NodeKind::BinaryExpression, vec![left, op, right]);
        }
        left
    }

    /// Right operand, or an empty error node when the input stops early
    fn parse_operand(&mut self, parse: fn(&mut Self) -> MockNode) -> MockNode {
        if self.at_stop() {
            MockNode::node(NodeKind::Error, Vec::new())
        } else {
            parse(self)
        }
    }

    fn parse_not(&mut self) -> MockNode {
        if self.at_keyword("NOT") {
            let op = self.bump();
            let operand = self.parse_not();
            return MockNode::node(NodeKind::UnaryExpression, vec![op, operand]);
        }
        if self.at_keyword("EXISTS") {
            let op = self.bump();
            let operand = self.parse_primary();
            return MockNode::node(NodeKind::UnaryExpression, vec![op, operand]);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> MockNode {
        let left = self.parse_additive();
        if self.at_operator(COMPARISON_OPERATORS) {
            let op = self.bump();
            let right = self.parse_operand(Self::parse_additive);
            return MockNode::node(NodeKind::BinaryExpression, vec![left, op, right]);
        }
        if self.at_keyword("IS") {
            let mut children = vec![left, self.bump()];
            self.eat_keyword("NOT", &mut children);
            if self.at(NodeKind::Literal) {
                children.push(self.bump());
            }
            return MockNode::node(NodeKind::BinaryExpression, children);
        }
        let negated =
            self.at_keyword("NOT") && self.nth_is_keyword(1, &["IN", "LIKE", "ILIKE", "BETWEEN"]);
        if !negated && !self.at_any_keyword(&["IN", "LIKE", "ILIKE", "BETWEEN"]) {
            return left;
        }
        let mut children = vec![left];
        self.eat_keyword("NOT", &mut children);
        if self.eat_keyword("IN", &mut children) {
            if self.at_subquery() {
                children.push(self.parse_primary());
            } else if self.at(NodeKind::LeftParen) {
                let mut list = vec![self.bump()];
                self.parse_expression_list(&mut list);
                self.eat(NodeKind::RightParen, &mut list);
                children.push(MockNode::node(NodeKind::InList, list));
            }
        } else if self.eat_keyword("BETWEEN", &mut children) {
            children.push(self.parse_operand(Self::parse_additive));
            if self.eat_keyword("AND", &mut children) {
                children.push(self.parse_operand(Self::parse_additive));
            }
        } else {
            children.push(self.bump());
            children.push(self.parse_operand(Self::parse_additive));
        }
        MockNode::node(NodeKind::BinaryExpression, children)
    }

    fn parse_additive(&mut self) -> MockNode {
        let mut left = self.parse_unary();
        loop {
            let arithmetic = self.at_operator(&["+", "-", "/", "%", "||", "::"])
                || self.at(NodeKind::Asterisk);
            if !arithmetic {
                break;
            }
            // `*` between operands multiplies
            let op = self.bump_as(Some(NodeKind::Operator));
            let right = self.parse_operand(Self::parse_unary);
            left = MockNode::node(NodeKind::BinaryExpression, vec![left, op, right]);
        }
        left
    }

    fn parse_unary(&mut self) -> MockNode {
        if self.at_operator(&["-", "+"]) {
            let op = self.bump();
            let operand = self.parse_operand(Self::parse_unary);
            return MockNode::node(NodeKind::UnaryExpression, vec![op, operand]);
        }
        let mut primary = self.parse_primary();
        while primary.kind() == NodeKind::ParenthesizedExpression && self.at(NodeKind::Period) {
            let mut children = vec![primary, self.bump()];
            if self.at_name() {
                children.push(self.bump());
            }
            primary = MockNode::node(NodeKind::MemberAccess, children);
        }
        primary
    }

    fn parse_primary(&mut self) -> MockNode {
        let Some(token) = self.peek() else {
            return MockNode::node(NodeKind::Error, Vec::new());
        };
        let (kind, is_case) = (token.kind, token.upper == "CASE");
        match kind {
            NodeKind::Literal
            | NodeKind::StringLiteral
            | NodeKind::BatchVariable
            | NodeKind::ExternalParameter
            | NodeKind::ExternalVariable => self.bump(),
            NodeKind::Identifier | NodeKind::QuotedIdentifier => self.parse_name_expression(),
            NodeKind::LeftParen if self.at_subquery() => {
                let mut children = vec![self.bump(), self.parse_query()];
                self.eat(NodeKind::RightParen, &mut children);
                MockNode::node(NodeKind::ScalarSubquery, children)
            }
            NodeKind::LeftParen => {
                let mut children = vec![self.bump()];
                self.parse_expression_list(&mut children);
                self.eat(NodeKind::RightParen, &mut children);
                MockNode::node(NodeKind::ParenthesizedExpression, children)
            }
            NodeKind::Keyword if is_case => self.parse_case(),
            NodeKind::Keyword
                if self.peek_nth(1).is_some_and(|t| t.kind == NodeKind::LeftParen) =>
            {
                // Keyword spelled function name, e.g. `left(name, 2)`
                let name = self.bump();
                let arguments = self.parse_arguments();
                MockNode::node(NodeKind::FunctionCall, vec![name, arguments])
            }
            _ if self.at_stop() => MockNode::node(NodeKind::Error, Vec::new()),
            _ => {
                let token = self.bump();
                MockNode::node(NodeKind::Error, vec![token])
            }
        }
    }

    /// Column reference, tuple reference or function call
    fn parse_name_expression(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        while self.at(NodeKind::Period) {
            if self.peek_nth(1).is_some_and(|t| t.kind == NodeKind::Asterisk) {
                children.push(self.bump());
                children.push(self.bump());
                return MockNode::node(NodeKind::TupleReference, children);
            }
            children.push(self.bump());
            if !self.at_name() {
                break;
            }
            children.push(self.bump());
        }
        if self.at(NodeKind::LeftParen) {
            let name = if children.len() == 1 {
                children.remove(0)
            } else {
                MockNode::node(NodeKind::QualifiedName, children)
            };
            let arguments = self.parse_arguments();
            return MockNode::node(NodeKind::FunctionCall, vec![name, arguments]);
        }
        MockNode::node(NodeKind::ColumnReference, children)
    }

    fn parse_arguments(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        self.eat_keyword("DISTINCT", &mut children);
        if !self.eat(NodeKind::Asterisk, &mut children) {
            self.parse_expression_list(&mut children);
        }
        self.recover(&mut children, |p| p.at(NodeKind::RightParen) || p.at(NodeKind::Semicolon));
        self.eat(NodeKind::RightParen, &mut children);
        MockNode::node(NodeKind::ArgumentList, children)
    }

    fn parse_case(&mut self) -> MockNode {
        let mut children = vec![self.bump()];
        if !self.at_keyword("WHEN") && !self.at_stop() {
            children.push(self.parse_expr());
        }
        loop {
            if !self.at_any_keyword(&["WHEN", "THEN", "ELSE"]) {
                break;
            }
            children.push(self.bump());
            if !self.at_stop() {
                children.push(self.parse_expr());
            }
        }
        self.eat_keyword("END", &mut children);
        MockNode::node(NodeKind::CaseExpression, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_insight_ir::SyntaxNode;

    fn kinds(node: SyntaxNode<'_>) -> Vec<NodeKind> {
        node.children().map(|c| c.kind()).collect()
    }

    fn statement(tree: &SyntaxTree) -> SyntaxNode<'_> {
        tree.root().unwrap().children().next().unwrap()
    }

    #[test]
    fn test_tokenizer_kinds() {
        let tokens = tokenize("SELECT \"Id\", 'x''y', 1.5, @v, :p, $1, ${env} FROM t -- comment");
        let kinds: Vec<NodeKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Keyword,
                NodeKind::QuotedIdentifier,
                NodeKind::Comma,
                NodeKind::StringLiteral,
                NodeKind::Comma,
                NodeKind::Literal,
                NodeKind::Comma,
                NodeKind::BatchVariable,
                NodeKind::Comma,
                NodeKind::ExternalParameter,
                NodeKind::Comma,
                NodeKind::ExternalParameter,
                NodeKind::Comma,
                NodeKind::ExternalVariable,
                NodeKind::Keyword,
                NodeKind::Identifier,
            ]
        );
        assert_eq!(tokens[3].range, TextRange::new(13, 19));
    }

    #[test]
    fn test_select_shape() {
        let tree = TestSqlParser.parse_text("SELECT u.id AS uid FROM users u WHERE u.id = 1");
        let select = statement(&tree);
        assert_eq!(select.kind(), NodeKind::SelectStatement);
        assert_eq!(
            kinds(select),
            vec![
                NodeKind::Keyword,
                NodeKind::SelectList,
                NodeKind::FromClause,
                NodeKind::WhereClause
            ]
        );
        let item = select
            .first_child_of_kind(NodeKind::SelectList)
            .unwrap()
            .first_child_of_kind(NodeKind::SelectItem)
            .unwrap();
        assert_eq!(kinds(item), vec![NodeKind::ColumnReference, NodeKind::Alias]);
        let reference = select
            .first_child_of_kind(NodeKind::FromClause)
            .unwrap()
            .first_child_of_kind(NodeKind::TableReference)
            .unwrap();
        assert_eq!(kinds(reference), vec![NodeKind::TableName, NodeKind::CorrelationName]);
    }

    #[test]
    fn test_dangling_period_keeps_member_access() {
        let tree = TestSqlParser.parse_text("SELECT u. FROM users u");
        let select = statement(&tree);
        let reference = select
            .descendants()
            .find(|n| n.kind() == NodeKind::ColumnReference)
            .unwrap();
        assert_eq!(kinds(reference), vec![NodeKind::Identifier, NodeKind::Period]);
        assert!(select.first_child_of_kind(NodeKind::FromClause).is_some());
    }

    #[test]
    fn test_joins_nest_left() {
        let tree = TestSqlParser.parse_text(
            "SELECT * FROM users u JOIN orders o ON o.user_id = u.id \
             LEFT JOIN products p ON p.id = o.id",
        );
        let from = statement(&tree).first_child_of_kind(NodeKind::FromClause).unwrap();
        let outer = from.first_child_of_kind(NodeKind::JoinedTable).unwrap();
        let children = kinds(outer);
        assert_eq!(children[0], NodeKind::JoinedTable);
        assert_eq!(*children.last().unwrap(), NodeKind::JoinCondition);
    }

    #[test]
    fn test_cte_and_derived_table() {
        let tree = TestSqlParser.parse_text(
            "WITH recent (uid) AS (SELECT user_id FROM orders) \
             SELECT d.uid FROM (SELECT uid FROM recent) d",
        );
        let select = statement(&tree);
        let with = select.first_child_of_kind(NodeKind::WithClause).unwrap();
        let cte = with.first_child_of_kind(NodeKind::CommonTableExpression).unwrap();
        assert_eq!(
            kinds(cte),
            vec![
                NodeKind::Identifier,
                NodeKind::ColumnList,
                NodeKind::Keyword,
                NodeKind::LeftParen,
                NodeKind::SelectStatement,
                NodeKind::RightParen
            ]
        );
        let derived = select
            .first_child_of_kind(NodeKind::FromClause)
            .unwrap()
            .first_child_of_kind(NodeKind::DerivedTable)
            .unwrap();
        assert_eq!(*kinds(derived).last().unwrap(), NodeKind::CorrelationName);
    }

    #[test]
    fn test_set_operation() {
        let tree = TestSqlParser.parse_text("SELECT id FROM users UNION ALL SELECT id FROM orders");
        let union = statement(&tree);
        assert_eq!(union.kind(), NodeKind::SetOperation);
        assert_eq!(union.children_of_kind(NodeKind::SelectStatement).len(), 2);
    }

    #[test]
    fn test_function_call_and_subquery() {
        let tree =
            TestSqlParser.parse_text("SELECT count(*), (SELECT max(id) FROM orders) FROM users");
        let select = statement(&tree);
        let calls = select
            .descendants()
            .filter(|n| n.kind() == NodeKind::FunctionCall)
            .count();
        assert_eq!(calls, 2);
        assert!(select.descendants().any(|n| n.kind() == NodeKind::ScalarSubquery));
    }

    #[test]
    fn test_dml_shapes() {
        let tree =
            TestSqlParser.parse_text("INSERT INTO users (id, name) VALUES (1, 'a'), (2, 'b')");
        let insert = statement(&tree);
        assert_eq!(
            kinds(insert),
            vec![
                NodeKind::Keyword,
                NodeKind::Keyword,
                NodeKind::TableName,
                NodeKind::ColumnList,
                NodeKind::ValuesClause
            ]
        );
        let values = insert.first_child_of_kind(NodeKind::ValuesClause).unwrap();
        assert_eq!(values.children_of_kind(NodeKind::ValuesRow).len(), 2);

        let tree = TestSqlParser.parse_text("UPDATE users u SET name = 'x' WHERE u.id = 1");
        let update = statement(&tree);
        assert_eq!(
            kinds(update),
            vec![
                NodeKind::Keyword,
                NodeKind::TableReference,
                NodeKind::SetClause,
                NodeKind::WhereClause
            ]
        );

        let tree = TestSqlParser.parse_text("DELETE FROM orders WHERE total > 10");
        assert_eq!(statement(&tree).kind(), NodeKind::DeleteStatement);
    }

    #[test]
    fn test_ddl_shapes() {
        let tree = TestSqlParser.parse_text(
            "CREATE TABLE audit (id integer, note varchar(20) NOT NULL, PRIMARY KEY (id))",
        );
        let create = statement(&tree);
        assert_eq!(create.children_of_kind(NodeKind::ColumnDefinition).len(), 2);

        let tree = TestSqlParser.parse_text("ALTER TABLE users RENAME COLUMN name TO full_name");
        let alter = statement(&tree);
        let action = alter.first_child_of_kind(NodeKind::AlterAction).unwrap();
        assert_eq!(
            kinds(action),
            vec![
                NodeKind::Keyword,
                NodeKind::Keyword,
                NodeKind::ColumnName,
                NodeKind::Keyword,
                NodeKind::Identifier
            ]
        );

        let tree = TestSqlParser.parse_text("DROP TABLE IF EXISTS a, b");
        let drop = statement(&tree);
        assert_eq!(drop.children_of_kind(NodeKind::TableName).len(), 2);

        let tree = TestSqlParser.parse_text("DROP INDEX idx");
        let drop = statement(&tree);
        assert!(drop.has_keyword("INDEX"));
    }

    #[test]
    fn test_unknown_statement_goes_to_error_node() {
        let tree = TestSqlParser.parse_text("GRANT SELECT ON users TO bob");
        let root = tree.root().unwrap();
        assert_eq!(kinds(root), vec![NodeKind::Error]);
    }

    #[test]
    fn test_blank_input_is_degenerate() {
        assert!(TestSqlParser.parse_text("   ").is_degenerate());
    }
}

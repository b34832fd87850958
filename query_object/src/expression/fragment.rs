//! Render text as a sequence of segments
//!
//! Placeholders, column references and dialect-dependent calls are kept as
//! nodes next to the raw SQL text, so parameter renames and navigation
//! resolution rewrite nodes instead of searching rendered strings.

use crate::param::{ParamName, Parameter};
use crate::render::{Dialect, RenderContext};
use std::collections::{BTreeMap, HashMap};

/// Unresolved navigation from an entity-bound source to the table owning a column.
///
/// `hops` are navigation property names walked from the root entity; an
/// empty path refers to the root entity itself (possibly one of its base
/// tables).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationPath {
    pub(crate) hops: Vec<String>,
    pub(crate) table: String,
}

impl NavigationPath {
    pub fn hops(&self) -> &[String] {
        &self.hops
    }

    /// Table that owns the referenced column
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Marker spelling of an unresolved path, `_{Customer}_{Address}_Address`
    fn marker(&self) -> String {
        let mut marker = String::new();
        for hop in &self.hops {
            marker.push_str("_{");
            marker.push_str(hop);
            marker.push('}');
        }
        marker.push('_');
        marker.push_str(&self.table);
        marker
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnRef {
    /// Table or alias parts; empty for an unqualified column
    pub(crate) qualifier: Vec<String>,
    pub(crate) column: String,
    pub(crate) path: Option<NavigationPath>,
}

impl ColumnRef {
    fn render(&self, dialect: Dialect) -> String {
        let column = if self.column == "*" {
            "*".to_string()
        } else {
            dialect.quote_ident(&self.column)
        };

        if let Some(path) = &self.path {
            return format!("{}.{}", dialect.quote_ident(&path.marker()), column);
        }

        let mut parts: Vec<String> = self
            .qualifier
            .iter()
            .map(|part| dialect.quote_ident(part))
            .collect();
        parts.push(column);
        parts.join(".")
    }
}

/// Date part extracted by `year()`, `month()`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    fn keyword(&self) -> &'static str {
        match self {
            DatePart::Year => "YEAR",
            DatePart::Month => "MONTH",
            DatePart::Day => "DAY",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
        }
    }
}

/// Functions whose spelling differs between dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    /// Zero-based position of `args[1]` in `args[0]`, -1 when absent
    IndexOf,
    /// `args[0]` from one-based `args[1]` for `args[2]` characters
    Substring,
    DatePart(DatePart),
    BitXor,
    Length,
}

impl Function {
    fn render(&self, dialect: Dialect, args: &[String]) -> String {
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("NULL");
        match (self, dialect) {
            (Function::IndexOf, Dialect::SqlServer) => {
                format!("(CHARINDEX({}, {}) - 1)", arg(1), arg(0))
            }
            (Function::IndexOf, Dialect::Postgres) => {
                format!("(STRPOS({}, {}) - 1)", arg(0), arg(1))
            }
            (Function::Substring, Dialect::SqlServer) => {
                format!("SUBSTRING({}, {}, {})", arg(0), arg(1), arg(2))
            }
            (Function::Substring, Dialect::Postgres) => {
                format!("SUBSTRING({} FROM {} FOR {})", arg(0), arg(1), arg(2))
            }
            (Function::DatePart(part), Dialect::SqlServer) => {
                format!("DATEPART({}, {})", part.keyword().to_lowercase(), arg(0))
            }
            (Function::DatePart(part), Dialect::Postgres) => {
                format!("EXTRACT({} FROM {})", part.keyword(), arg(0))
            }
            (Function::BitXor, Dialect::SqlServer) => format!("({} ^ {})", arg(0), arg(1)),
            (Function::BitXor, Dialect::Postgres) => format!("({} # {})", arg(0), arg(1)),
            (Function::Length, Dialect::SqlServer) => format!("LEN({})", arg(0)),
            (Function::Length, Dialect::Postgres) => format!("LENGTH({})", arg(0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Sql(String),
    Param(ParamName),
    Column(ColumnRef),
    Call { function: Function, args: Vec<Fragment> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Fragment {
    segments: Vec<Segment>,
}

impl Fragment {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sql(text: impl Into<String>) -> Self {
        let mut fragment = Self::new();
        fragment.push_sql(text);
        fragment
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub(crate) fn push_sql(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        // keep adjacent text in one segment so wrapping checks see whole tokens
        if let Some(Segment::Sql(last)) = self.segments.last_mut() {
            last.push_str(&text);
        } else {
            self.segments.push(Segment::Sql(text));
        }
    }

    pub(crate) fn push_param(&mut self, name: ParamName) {
        self.segments.push(Segment::Param(name));
    }

    pub(crate) fn push_column(&mut self, column: ColumnRef) {
        self.segments.push(Segment::Column(column));
    }

    pub(crate) fn push_call(&mut self, function: Function, args: Vec<Fragment>) {
        self.segments.push(Segment::Call { function, args });
    }

    pub(crate) fn extend(&mut self, other: Fragment) {
        for segment in other.segments {
            match segment {
                Segment::Sql(text) => self.push_sql(text),
                other => self.segments.push(other),
            }
        }
    }

    /// `(self)`
    pub(crate) fn wrapped(self) -> Fragment {
        let mut out = Fragment::sql("(");
        out.extend(self);
        out.push_sql(")");
        out
    }

    /// Whether the whole fragment is enclosed by one matching pair of
    /// parentheses, so it can be combined without adding another pair
    pub(crate) fn is_wrapped(&self) -> bool {
        let count = self.segments.len();
        match (self.segments.first(), self.segments.last()) {
            (Some(Segment::Sql(first)), Some(Segment::Sql(last)))
                if first.starts_with('(') && last.ends_with(')') => {}
            _ => return false,
        }

        let mut depth = 0usize;
        let mut in_quote = false;
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Sql(text) => {
                    for (j, c) in text.char_indices() {
                        if in_quote {
                            if c == '\'' {
                                in_quote = false;
                            }
                            continue;
                        }
                        match c {
                            '\'' => in_quote = true,
                            '(' => depth += 1,
                            ')' => {
                                if depth == 0 {
                                    return false;
                                }
                                depth -= 1;
                                let at_end = i == count - 1 && j == text.len() - 1;
                                if depth == 0 && !at_end {
                                    return false;
                                }
                            }
                            _ => {
                                if depth == 0 {
                                    return false;
                                }
                            }
                        }
                    }
                }
                _ => {
                    if depth == 0 {
                        return false;
                    }
                }
            }
        }
        depth == 0
    }

    /// Rename parameters; names missing from `renames` are kept
    pub(crate) fn remap(&mut self, renames: &HashMap<ParamName, ParamName>) {
        for segment in &mut self.segments {
            match segment {
                Segment::Param(name) => {
                    if let Some(renamed) = renames.get(name) {
                        *name = renamed.clone();
                    }
                }
                Segment::Call { args, .. } => {
                    for arg in args {
                        arg.remap(renames);
                    }
                }
                Segment::Sql(_) | Segment::Column(_) => {}
            }
        }
    }

    /// Parameter references in order of appearance, repeats included
    pub(crate) fn param_refs<'a>(&'a self, out: &mut Vec<&'a ParamName>) {
        for segment in &self.segments {
            match segment {
                Segment::Param(name) => out.push(name),
                Segment::Call { args, .. } => {
                    for arg in args {
                        arg.param_refs(out);
                    }
                }
                Segment::Sql(_) | Segment::Column(_) => {}
            }
        }
    }

    pub(crate) fn for_each_column(&self, f: &mut dyn FnMut(&ColumnRef)) {
        for segment in &self.segments {
            match segment {
                Segment::Column(column) => f(column),
                Segment::Call { args, .. } => {
                    for arg in args {
                        arg.for_each_column(f);
                    }
                }
                Segment::Sql(_) | Segment::Param(_) => {}
            }
        }
    }

    pub(crate) fn for_each_column_mut(&mut self, f: &mut dyn FnMut(&mut ColumnRef)) {
        for segment in &mut self.segments {
            match segment {
                Segment::Column(column) => f(column),
                Segment::Call { args, .. } => {
                    for arg in args {
                        arg.for_each_column_mut(f);
                    }
                }
                Segment::Sql(_) | Segment::Param(_) => {}
            }
        }
    }

    /// Render with `names` mapping this owner's parameter names to output names
    pub(crate) fn render(
        &self,
        ctx: &mut RenderContext,
        names: &HashMap<ParamName, ParamName>,
        params: &BTreeMap<ParamName, Parameter>,
    ) -> String {
        let mut sql = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Sql(text) => sql.push_str(text),
                Segment::Param(name) => {
                    let output = names.get(name).unwrap_or(name);
                    match params.get(name) {
                        Some(param) => sql.push_str(&ctx.placeholder(output, param)),
                        // unreachable while the bag invariant holds; render as SQL NULL
                        None => sql.push_str("NULL"),
                    }
                }
                Segment::Column(column) => sql.push_str(&column.render(ctx.dialect())),
                Segment::Call { function, args } => {
                    let rendered: Vec<String> = args
                        .iter()
                        .map(|arg| arg.render(ctx, names, params))
                        .collect();
                    sql.push_str(&function.render(ctx.dialect(), &rendered));
                }
            }
        }
        sql
    }
}

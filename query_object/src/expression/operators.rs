//! Named operators over expressions
//!
//! Comparisons return a [`Predicate`]; arithmetic, string, date and aggregate
//! operators return a new [`Expression`]. Bare values passed as the second
//! operand become parameters typed like the first operand.

use super::fragment::{DatePart, Fragment, Function};
use super::Expression;
use crate::predicate::Predicate;
use chrono::{DateTime, NaiveDate, Utc};
use type_mapping::{DbType, SqlValue};
use uuid::Uuid;

/// Right-hand side of an operator: another expression, inlined as SQL, or a
/// value bound as a parameter
#[derive(Debug)]
pub enum Operand {
    Expr(Expression),
    Value(SqlValue),
}

impl Operand {
    /// Whether this operand compares as NULL
    fn is_null(&self) -> bool {
        match self {
            Operand::Expr(expr) => expr.is_empty(),
            Operand::Value(value) => value.is_null(),
        }
    }

    pub(crate) fn into_expression(self, value_type: DbType) -> Expression {
        match self {
            Operand::Expr(expr) => expr,
            Operand::Value(value) => Expression::parameter(value_type, value),
        }
    }
}

impl From<Expression> for Operand {
    fn from(expr: Expression) -> Self {
        Operand::Expr(expr)
    }
}

impl From<SqlValue> for Operand {
    fn from(value: SqlValue) -> Self {
        Operand::Value(value)
    }
}

macro_rules! operand_from_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Operand {
                fn from(value: $t) -> Self {
                    Operand::Value(SqlValue::from(value))
                }
            }
        )*
    };
}

operand_from_value!(
    String,
    &str,
    i16,
    i32,
    i64,
    f32,
    f64,
    bool,
    Uuid,
    DateTime<Utc>,
    NaiveDate,
    serde_json::Value,
    Vec<u8>,
);

impl<T> From<Option<T>> for Operand
where
    T: Into<SqlValue>,
{
    fn from(value: Option<T>) -> Self {
        Operand::Value(value.map_or(SqlValue::Null, Into::into))
    }
}

/// Escape `LIKE` wildcards so the value matches literally under `ESCAPE '\'`
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[allow(clippy::should_implement_trait)]
impl Expression {
    /// `(self <op> right)`
    fn binary(mut self, operator: &str, right: Expression) -> Expression {
        let right = self.absorb(right);
        let mut fragment = Fragment::sql("(");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(format!(" {} ", operator));
        fragment.extend(right);
        fragment.push_sql(")");
        self.fragment = fragment;
        self
    }

    fn compare(self, operator: &str, right: impl Into<Operand>) -> Predicate {
        let right = right.into().into_expression(self.value_type);
        Predicate::from_expression(self.binary(operator, right))
    }

    /// `(self <suffix>)`
    fn postfix(mut self, suffix: &str) -> Expression {
        let mut fragment = Fragment::sql("(");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(format!(" {})", suffix));
        self.fragment = fragment;
        self
    }

    /// `<name>(self)`
    fn wrap_call(mut self, name: &str, value_type: DbType) -> Expression {
        let mut fragment = Fragment::sql(format!("{}(", name));
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(")");
        self.fragment = fragment;
        self.value_type = value_type;
        self
    }

    fn apply(mut self, function: Function, others: Vec<Expression>, value_type: DbType) -> Expression {
        let mut args = vec![std::mem::take(&mut self.fragment)];
        for other in others {
            args.push(self.absorb(other));
        }
        self.fragment.push_call(function, args);
        self.value_type = value_type;
        self
    }

    /// Equality and inequality treat an empty expression or a NULL value as
    /// a null test rather than a comparison
    fn equality(self, operator: &str, null_test: &str, right: Operand) -> Predicate {
        match (self.is_empty(), right.is_null()) {
            (true, true) => {
                let always = if operator == "=" { "(1=1)" } else { "(1=0)" };
                Predicate::from_expression(Expression {
                    fragment: Fragment::sql(always),
                    ..Expression::empty(DbType::Boolean)
                })
            }
            (false, true) => Predicate::from_expression(self.postfix(null_test)),
            (true, false) => {
                let value_type = self.value_type;
                Predicate::from_expression(right.into_expression(value_type).postfix(null_test))
            }
            (false, false) => self.compare(operator, right),
        }
    }

    pub fn eq(self, right: impl Into<Operand>) -> Predicate {
        self.equality("=", "IS NULL", right.into())
    }

    pub fn ne(self, right: impl Into<Operand>) -> Predicate {
        self.equality("<>", "IS NOT NULL", right.into())
    }

    pub fn lt(self, right: impl Into<Operand>) -> Predicate {
        self.compare("<", right)
    }

    pub fn le(self, right: impl Into<Operand>) -> Predicate {
        self.compare("<=", right)
    }

    pub fn gt(self, right: impl Into<Operand>) -> Predicate {
        self.compare(">", right)
    }

    pub fn ge(self, right: impl Into<Operand>) -> Predicate {
        self.compare(">=", right)
    }

    pub fn is_null(self) -> Predicate {
        self.eq(SqlValue::Null)
    }

    pub fn is_not_null(self) -> Predicate {
        self.ne(SqlValue::Null)
    }

    /// `(self IN (...))`; an empty list matches nothing
    pub fn in_values<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.membership("IN", "(1=0)", values)
    }

    /// `(self NOT IN (...))`; an empty list matches everything
    pub fn not_in_values<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.membership("NOT IN", "(1=1)", values)
    }

    fn membership<I, V>(mut self, keyword: &str, when_empty: &str, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let value_type = self.value_type;
        let items: Vec<Expression> = values
            .into_iter()
            .map(|v| v.into().into_expression(value_type))
            .collect();
        if items.is_empty() {
            return Predicate::from_expression(Expression {
                fragment: Fragment::sql(when_empty),
                ..Expression::empty(DbType::Boolean)
            });
        }

        let mut list = Fragment::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                list.push_sql(", ");
            }
            list.extend(self.absorb(item));
        }

        let mut fragment = Fragment::sql("(");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(format!(" {} (", keyword));
        fragment.extend(list);
        fragment.push_sql("))");
        self.fragment = fragment;
        Predicate::from_expression(self)
    }

    /// `(self BETWEEN low AND high)`
    pub fn between(mut self, low: impl Into<Operand>, high: impl Into<Operand>) -> Predicate {
        let value_type = self.value_type;
        let low = self.absorb(low.into().into_expression(value_type));
        let high = self.absorb(high.into().into_expression(value_type));

        let mut fragment = Fragment::sql("(");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(" BETWEEN ");
        fragment.extend(low);
        fragment.push_sql(" AND ");
        fragment.extend(high);
        fragment.push_sql(")");
        self.fragment = fragment;
        Predicate::from_expression(self)
    }

    fn arithmetic(self, operator: &str, right: impl Into<Operand>) -> Expression {
        let right = right.into().into_expression(self.value_type);
        self.binary(operator, right)
    }

    pub fn add(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("+", right)
    }

    pub fn sub(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("-", right)
    }

    pub fn mul(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("*", right)
    }

    pub fn div(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("/", right)
    }

    pub fn rem(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("%", right)
    }

    pub fn neg(mut self) -> Expression {
        let mut fragment = Fragment::sql("(-");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(")");
        self.fragment = fragment;
        self
    }

    pub fn bit_and(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("&", right)
    }

    pub fn bit_or(self, right: impl Into<Operand>) -> Expression {
        self.arithmetic("|", right)
    }

    /// `^` on SQL Server, `#` on PostgreSQL
    pub fn bit_xor(self, right: impl Into<Operand>) -> Expression {
        let value_type = self.value_type;
        let right = right.into().into_expression(value_type);
        self.apply(Function::BitXor, vec![right], value_type)
    }

    pub fn bit_not(mut self) -> Expression {
        let mut fragment = Fragment::sql("(~");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(")");
        self.fragment = fragment;
        self
    }

    /// `(self LIKE pattern)`, pattern passed through unescaped
    pub fn like(self, pattern: impl Into<Operand>) -> Predicate {
        self.compare("LIKE", pattern)
    }

    fn like_escaped(mut self, pattern: String) -> Predicate {
        let pattern = self.absorb(Expression::parameter(DbType::Text, pattern));
        let mut fragment = Fragment::sql("(");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(" LIKE ");
        fragment.extend(pattern);
        fragment.push_sql(" ESCAPE '\\')");
        self.fragment = fragment;
        Predicate::from_expression(self)
    }

    pub fn contains(self, value: &str) -> Predicate {
        self.like_escaped(format!("%{}%", escape_like(value)))
    }

    pub fn starts_with(self, value: &str) -> Predicate {
        self.like_escaped(format!("{}%", escape_like(value)))
    }

    pub fn ends_with(self, value: &str) -> Predicate {
        self.like_escaped(format!("%{}", escape_like(value)))
    }

    /// Characters from zero-based `start`, `length` long
    pub fn substring(self, start: i32, length: i32) -> Expression {
        let value_type = self.value_type;
        let start = Expression::parameter(DbType::Integer, start.saturating_add(1));
        let length = Expression::parameter(DbType::Integer, length);
        self.apply(Function::Substring, vec![start, length], value_type)
    }

    /// Zero-based position of `value`, or -1 when it does not occur
    pub fn index_of(self, value: impl Into<Operand>) -> Expression {
        let value = value.into().into_expression(DbType::Text);
        self.apply(Function::IndexOf, vec![value], DbType::Integer)
    }

    pub fn replace(mut self, from: impl Into<Operand>, to: impl Into<Operand>) -> Expression {
        let from = self.absorb(from.into().into_expression(DbType::Text));
        let to = self.absorb(to.into().into_expression(DbType::Text));

        let mut fragment = Fragment::sql("REPLACE(");
        fragment.extend(std::mem::take(&mut self.fragment));
        fragment.push_sql(", ");
        fragment.extend(from);
        fragment.push_sql(", ");
        fragment.extend(to);
        fragment.push_sql(")");
        self.fragment = fragment;
        self
    }

    pub fn upper(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("UPPER", value_type)
    }

    pub fn lower(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("LOWER", value_type)
    }

    pub fn trim(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("TRIM", value_type)
    }

    pub fn length(self) -> Expression {
        self.apply(Function::Length, Vec::new(), DbType::Integer)
    }

    pub fn date_part(self, part: DatePart) -> Expression {
        self.apply(Function::DatePart(part), Vec::new(), DbType::Integer)
    }

    pub fn year(self) -> Expression {
        self.date_part(DatePart::Year)
    }

    pub fn month(self) -> Expression {
        self.date_part(DatePart::Month)
    }

    pub fn day(self) -> Expression {
        self.date_part(DatePart::Day)
    }

    pub fn hour(self) -> Expression {
        self.date_part(DatePart::Hour)
    }

    pub fn minute(self) -> Expression {
        self.date_part(DatePart::Minute)
    }

    pub fn second(self) -> Expression {
        self.date_part(DatePart::Second)
    }

    pub fn count(self) -> Expression {
        self.wrap_call("COUNT", DbType::BigInt)
    }

    /// `COUNT(*)`
    pub fn count_all() -> Expression {
        Expression {
            fragment: Fragment::sql("COUNT(*)"),
            ..Expression::empty(DbType::BigInt)
        }
    }

    pub fn sum(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("SUM", value_type)
    }

    pub fn min(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("MIN", value_type)
    }

    pub fn max(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("MAX", value_type)
    }

    pub fn avg(self) -> Expression {
        let value_type = self.value_type;
        self.wrap_call("AVG", value_type)
    }

    /// `DISTINCT self`, for use inside an aggregate
    pub fn distinct(mut self) -> Expression {
        let mut fragment = Fragment::sql("DISTINCT ");
        fragment.extend(std::mem::take(&mut self.fragment));
        self.fragment = fragment;
        self
    }

    pub fn count_distinct(self) -> Expression {
        self.distinct().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Dialect;

    fn col(name: &str, ty: DbType) -> Expression {
        Expression::column(name, ty).unwrap()
    }

    #[test]
    fn test_comparison_wraps_bare_value_as_parameter() {
        let predicate = col("Users.Age", DbType::Integer).gt(18);
        let statement = predicate.render(Dialect::SqlServer);
        let (name, param) = &statement.parameters()[0];

        assert_eq!(statement.sql(), format!("([Users].[Age] > @{})", name));
        assert_eq!(statement.parameters().len(), 1);
        assert_eq!(param.db_type, DbType::Integer);
        assert_eq!(param.value, SqlValue::Integer(18));
    }

    #[test]
    fn test_value_takes_type_of_other_side() {
        let predicate = col("Price", DbType::Decimal).ge("9.99");
        let statement = predicate.render(Dialect::Postgres);
        assert_eq!(statement.sql(), "(\"Price\" >= $1::numeric)");
        assert_eq!(statement.parameters()[0].1.db_type, DbType::Decimal);
    }

    #[test]
    fn test_null_comparisons() {
        let is_null = col("B", DbType::Text).eq(None::<String>);
        assert_eq!(is_null.to_sql(), "([B] IS NULL)");
        assert!(is_null.parameters().is_empty());

        let not_null = col("B", DbType::Text).ne(Expression::empty(DbType::Text));
        assert_eq!(not_null.to_sql(), "([B] IS NOT NULL)");

        let reversed = Expression::empty(DbType::Text).eq(col("B", DbType::Text));
        assert_eq!(reversed.to_sql(), "([B] IS NULL)");

        assert_eq!(Expression::empty(DbType::Text).eq(SqlValue::Null).to_sql(), "(1=1)");
        assert_eq!(Expression::empty(DbType::Text).ne(SqlValue::Null).to_sql(), "(1=0)");
    }

    #[test]
    fn test_column_to_column_comparison() {
        let on = Expression::qualified("Employee", "DeptId", DbType::Integer)
            .unwrap()
            .eq(Expression::qualified("D", "Id", DbType::Integer).unwrap());
        assert_eq!(on.to_sql(), "([Employee].[DeptId] = [D].[Id])");
        assert!(on.parameters().is_empty());
    }

    #[test]
    fn test_in_values() {
        let status = col("Status", DbType::Text).in_values(["new", "open"]);
        let statement = status.render(Dialect::Postgres);
        assert_eq!(statement.sql(), "(\"Status\" IN ($1, $2))");
        assert_eq!(statement.parameters().len(), 2);

        let none: Vec<i32> = Vec::new();
        assert_eq!(col("Id", DbType::Integer).in_values(none.clone()).to_sql(), "(1=0)");
        assert_eq!(col("Id", DbType::Integer).not_in_values(none).to_sql(), "(1=1)");
    }

    #[test]
    fn test_between() {
        let statement = col("Age", DbType::Integer)
            .between(18, 65)
            .render(Dialect::Postgres);
        assert_eq!(statement.sql(), "(\"Age\" BETWEEN $1 AND $2)");
    }

    #[test]
    fn test_arithmetic_nests() {
        let total = col("Price", DbType::Double)
            .mul(col("Qty", DbType::Double))
            .sub(1.5);
        let statement = total.render(Dialect::Postgres);
        assert_eq!(statement.sql(), "((\"Price\" * \"Qty\") - $1)");
        assert_eq!(total.value_type(), DbType::Double);
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let predicate = col("Name", DbType::Text).contains("50%_off");
        let statement = predicate.render(Dialect::SqlServer);
        let (name, param) = &statement.parameters()[0];
        assert_eq!(
            statement.sql(),
            format!("([Name] LIKE @{} ESCAPE '\\')", name)
        );
        assert_eq!(param.value, SqlValue::from("%50\\%\\_off%"));

        let starts = col("Name", DbType::Text).starts_with("ab").render(Dialect::SqlServer);
        assert_eq!(starts.parameters()[0].1.value, SqlValue::from("ab%"));
    }

    #[test]
    fn test_substring_is_zero_based() {
        let statement = col("Name", DbType::Text)
            .substring(0, 3)
            .render(Dialect::Postgres);
        assert_eq!(statement.sql(), "SUBSTRING(\"Name\" FROM $1 FOR $2)");
        assert_eq!(statement.parameters()[0].1.value, SqlValue::Integer(1));
        assert_eq!(statement.parameters()[1].1.value, SqlValue::Integer(3));
    }

    #[test]
    fn test_dialect_dependent_operators() {
        let index = col("Name", DbType::Text).index_of("x");
        assert_eq!(index.value_type(), DbType::Integer);
        assert_eq!(
            index.render(Dialect::Postgres).sql(),
            "(STRPOS(\"Name\", $1) - 1)"
        );

        let year = col("Created", DbType::Timestamp).year();
        assert_eq!(year.to_sql(), "DATEPART(year, [Created])");
        assert_eq!(year.render(Dialect::Postgres).sql(), "EXTRACT(YEAR FROM \"Created\")");

        let xor = col("Flags", DbType::Integer).bit_xor(col("Mask", DbType::Integer));
        assert_eq!(xor.to_sql(), "([Flags] ^ [Mask])");
        assert_eq!(xor.render(Dialect::Postgres).sql(), "(\"Flags\" # \"Mask\")");

        assert_eq!(col("Name", DbType::Text).length().to_sql(), "LEN([Name])");
    }

    #[test]
    fn test_aggregates() {
        let count = col("Id", DbType::Integer).count();
        assert_eq!(count.value_type(), DbType::BigInt);
        assert_eq!(count.to_sql(), "COUNT([Id])");

        assert_eq!(
            col("Id", DbType::Integer).count_distinct().to_sql(),
            "COUNT(DISTINCT [Id])"
        );
        assert_eq!(Expression::count_all().to_sql(), "COUNT(*)");
        assert_eq!(col("Total", DbType::Double).sum().value_type(), DbType::Double);
    }

    #[test]
    fn test_nested_expression_is_inlined() {
        let doubled = col("Qty", DbType::Integer).mul(2);
        let predicate = col("Limit", DbType::Integer).lt(doubled);
        let statement = predicate.render(Dialect::Postgres);
        assert_eq!(statement.sql(), "(\"Limit\" < (\"Qty\" * $1))");
        assert_eq!(statement.parameters().len(), 1);
    }
}

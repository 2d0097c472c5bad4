//! The heuristic composer: a deterministic, offline fallback that turns free text into SQL using
//! nothing but the annotated schema text.
//!
//! It is deliberately naive. Tables count as mentioned when their name occurs anywhere in the
//! lower-cased text, so overlapping names (`order` / `orders`) both match. Only the first two
//! mentioned tables are ever joined, and only over a direct foreign key between them.

pub mod statement;

use itertools::Itertools;
use statement::{ColumnName, Equals, Projection, Select};

use crate::schema::format::{ParsedTable, parse_tables};

/// Stand-in table name used when the text mentions no known table.
pub const PLACEHOLDER_TABLE: &str = "table_name";

const COUNT_ALIAS: &str = "cnt";

const COUNT_PHRASES: [&str; 3] = ["count", "how many", "number of"];

/// What a request asks for, as far as the heuristic can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntent {
    /// Mentioned tables, in schema order.
    pub mentioned_tables: Vec<String>,
    pub wants_count: bool,
}

impl QueryIntent {
    #[must_use]
    pub fn detect(text: &str, tables: &[ParsedTable]) -> Self {
        let lowered = text.to_lowercase();

        Self {
            mentioned_tables: tables
                .iter()
                .filter(|e| lowered.contains(&e.name.to_lowercase()))
                .map(|e| e.name.clone())
                .unique()
                .collect(),
            wants_count: COUNT_PHRASES.iter().any(|e| lowered.contains(e)),
        }
    }
}

/// Compose a single SQL statement for `text`. Never fails: without a usable schema or request,
/// the result is a placeholder query against [`PLACEHOLDER_TABLE`].
#[must_use]
pub fn compose(text: &str, schema_text: &str) -> String {
    if text.trim().is_empty() {
        return single_table(PLACEHOLDER_TABLE, false, None);
    }

    let tables = parse_tables(schema_text);
    let intent = QueryIntent::detect(text, &tables);

    match intent.mentioned_tables.as_slice() {
        [] => single_table(PLACEHOLDER_TABLE, intent.wants_count, None),
        [table] => single_table(table, intent.wants_count, Some(COUNT_ALIAS)),
        [first, second, ..] => infer_join(&tables, first, second).map_or_else(
            || single_table(first, intent.wants_count, Some(COUNT_ALIAS)),
            |on| {
                let projection = if intent.wants_count {
                    Projection::Count {
                        alias: Some(COUNT_ALIAS.to_string()),
                    }
                } else {
                    Projection::AllOf(vec![first.clone(), second.clone()])
                };

                Select::new(projection, first.as_str()).join(second.as_str(), on).query()
            },
        ),
    }
}

fn single_table(table: &str, wants_count: bool, count_alias: Option<&str>) -> String {
    let projection = if wants_count {
        Projection::Count {
            alias: count_alias.map(str::to_string),
        }
    } else {
        Projection::Everything
    };

    Select::new(projection, table).query()
}

/// A join condition over a direct foreign key between `a` and `b`, preferring keys held by `a`.
fn infer_join(tables: &[ParsedTable], a: &str, b: &str) -> Option<Equals> {
    foreign_key_between(tables, a, b).or_else(|| foreign_key_between(tables, b, a))
}

/// `from.column = to.target` for the first column of `from` whose foreign key targets `to`.
fn foreign_key_between(tables: &[ParsedTable], from: &str, to: &str) -> Option<Equals> {
    tables
        .iter()
        .find(|e| e.name == from)?
        .columns
        .iter()
        .find_map(|column| {
            let target = column.foreign_key.as_ref()?;

            target.table.eq_ignore_ascii_case(to).then(|| {
                Equals::new(
                    ColumnName::new_with_table(from, &column.name),
                    ColumnName::new_with_table(to, &target.column),
                )
            })
        })
}

#[cfg(test)]
mod test {
    use super::{QueryIntent, compose};
    use crate::schema::format::parse_tables;

    const SHOP: &str = "users (\n  id INT [PK],\n  name TEXT\n)\n\
                        orders (\n  id INT [PK],\n  user_id INT [FK->users.id]\n)\n\
                        products (\n  id INT [PK]\n)\n";

    #[test]
    fn test_single_table() {
        assert_eq!(compose("show me all products", SHOP), "SELECT * FROM products;");
        assert_eq!(compose("list all USERS", "users (\n  id INT\n)"), "SELECT * FROM users;");
    }

    #[test]
    fn test_single_table_count() {
        assert_eq!(
            compose("how many products do we sell", SHOP),
            "SELECT COUNT(*) AS cnt FROM products;"
        );
        assert_eq!(
            compose("give me the number of products", SHOP),
            "SELECT COUNT(*) AS cnt FROM products;"
        );
        assert_eq!(
            compose("Count products", SHOP),
            "SELECT COUNT(*) AS cnt FROM products;"
        );
    }

    #[test]
    fn test_join_over_foreign_key() {
        let query = compose("show orders for users", SHOP);

        assert_eq!(
            query,
            "SELECT users.*, orders.* FROM users JOIN orders ON orders.user_id = users.id;"
        );
    }

    #[test]
    fn test_join_count() {
        assert_eq!(
            compose("how many orders do users have", SHOP),
            "SELECT COUNT(*) AS cnt FROM users JOIN orders ON orders.user_id = users.id;"
        );
    }

    #[test]
    fn test_join_prefers_keys_of_first_table() {
        let schema = "orders (\n  id INT [PK],\n  user_id INT [FK->users.id]\n)\n\
                      users (\n  id INT [PK],\n  last_order_id INT [FK->orders.id]\n)\n";

        assert_eq!(
            compose("orders and users", schema),
            "SELECT orders.*, users.* FROM orders JOIN users ON orders.user_id = users.id;"
        );
    }

    #[test]
    fn test_join_ignores_further_mentions() {
        assert_eq!(
            compose("users, orders and products", SHOP),
            "SELECT users.*, orders.* FROM users JOIN orders ON orders.user_id = users.id;"
        );
    }

    #[test]
    fn test_no_foreign_key_falls_back_to_first_table() {
        assert_eq!(compose("users and products", SHOP), "SELECT * FROM users;");
        assert_eq!(
            compose("count users and products", SHOP),
            "SELECT COUNT(*) AS cnt FROM users;"
        );
    }

    #[test]
    fn test_only_first_foreign_key_alternative_joins() {
        let schema = "customers (\n  id INT [PK]\n)\n\
                      users (\n  id INT [PK]\n)\n\
                      orders (\n  buyer_id INT [FK->customers.id|users.id]\n)\n";

        assert_eq!(compose("orders of users", schema), "SELECT * FROM users;");
        assert_eq!(
            compose("orders of customers", schema),
            "SELECT customers.*, orders.* FROM customers JOIN orders ON orders.buyer_id = customers.id;"
        );
    }

    #[test]
    fn test_quoted_table_names() {
        let schema = "orders (\n  id INT [PK]\n)\n\
                      \"order items\" (\n  id INT [PK],\n  order_id INT [FK->orders.id]\n)\n";

        assert_eq!(
            compose("list order items", schema),
            "SELECT * FROM \"order items\";"
        );
        assert_eq!(
            compose("show orders with their order items", schema),
            "SELECT orders.*, \"order items\".* FROM orders JOIN \"order items\" ON \"order items\".order_id = orders.id;"
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(compose("", SHOP), "SELECT * FROM table_name;");
        assert_eq!(compose("   ", ""), "SELECT * FROM table_name;");
        assert_eq!(compose("show everything", ""), "SELECT * FROM table_name;");
        assert_eq!(compose("how many rows", SHOP), "SELECT COUNT(*) FROM table_name;");
    }

    #[test]
    fn test_deterministic() {
        let text = "show orders for users";

        assert_eq!(compose(text, SHOP), compose(text, SHOP));
    }

    #[test]
    fn test_intent_uses_substring_containment() {
        let tables = parse_tables("order (\n  id INT\n)\norders (\n  id INT\n)\n");

        let intent = QueryIntent::detect("all orders", &tables);

        assert_eq!(intent.mentioned_tables, vec!["order", "orders"]);
        assert!(!intent.wants_count);
    }
}

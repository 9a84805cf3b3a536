// SPDX-License-Identifier: Apache-2.0

//! Instruction templates sent to generation providers.
//!
//! Both builders only substitute the schema text; they never look at the
//! structured snapshot.

const SCHEMA_PLACEHOLDER: &str = "{schema}";

const QUERY_TEMPLATE: &str = r#"You are a SQL query generator for a PostgreSQL database. Convert the user's natural language request into one valid SQL query.

RULES:
1. Output ONLY the SQL query. No explanations, no markdown code fences, no comments.
2. Use only SELECT or WITH (CTE) statements. Never produce INSERT, UPDATE, DELETE, DROP, ALTER, TRUNCATE or any other statement that modifies data or schema.
3. Prefer explicit column names over SELECT *, especially for large tables.
4. Join tables through the foreign key relationships shown in the schema.
5. Use table aliases when joining more than one table.
6. If the request is ambiguous, make a reasonable assumption and proceed.
7. Add a LIMIT clause to potentially large result sets (LIMIT 100 unless the user asks otherwise).
8. Format dates and timestamps readably when they are part of the output.

DATABASE SCHEMA:
{schema}

If the request CANNOT be answered with the tables and columns above, respond with exactly:
MISSING: <what tables, columns or data would be needed>

Never invent table or column names that are not in the schema.

EXAMPLES:

User: "how many customers signed up last month"
SELECT COUNT(*) AS customer_count
FROM customers
WHERE created_at >= date_trunc('month', current_date - interval '1 month')
  AND created_at < date_trunc('month', current_date);

User: "show me all orders with customer emails"
SELECT o.id, o.total, o.created_at, c.email
FROM orders o
JOIN customers c ON o.customer_id = c.id
ORDER BY o.created_at DESC
LIMIT 100;

User: "what's the weather today"
MISSING: The database has no weather data. It holds customers, orders and related business records, none of which describe weather."#;

const DISCOVERY_TEMPLATE: &str = r#"You help people explore a PostgreSQL database they have never seen before. Study the schema below and propose questions it can answer.

DATABASE SCHEMA:
{schema}

RULES:
1. Group the questions into 3 to 6 business domains inferred from the tables (for example "Sales", "Customers", "Operations").
2. For each domain write a one-sentence description of the data behind it.
3. Give 3 to 5 example questions per domain, phrased the way a non-technical user would ask them.
4. Every question must be answerable with a read-only query over the tables above. Do not reference tables or columns that are not in the schema.
5. Respond with JSON only, no prose and no code fences, in exactly this shape:

[
  {
    "domain": "Sales",
    "description": "Orders and their totals over time.",
    "questions": [
      "What was total revenue last month?",
      "Which ten customers spent the most this year?"
    ]
  }
]"#;

/// Instruction for turning a request into a single read-only query.
pub fn build_instruction(schema_text: &str) -> String {
    QUERY_TEMPLATE.replacen(SCHEMA_PLACEHOLDER, schema_text, 1)
}

/// Instruction asking for categorized example questions about the schema.
pub fn build_discovery_instruction(schema_text: &str) -> String {
    DISCOVERY_TEMPLATE.replacen(SCHEMA_PLACEHOLDER, schema_text, 1)
}

/// User message paired with the discovery instruction
pub const DISCOVERY_USER_PROMPT: &str =
    "Suggest questions I can ask about this database.";

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "TABLE: customers\n  - id: integer, PK, NOT NULL\n";

    #[test]
    fn test_instruction_embeds_schema_verbatim() {
        let prompt = build_instruction(SCHEMA);

        assert!(prompt.contains("DATABASE SCHEMA:\nTABLE: customers\n  - id: integer, PK, NOT NULL\n"));
        assert!(!prompt.contains(SCHEMA_PLACEHOLDER));
        assert!(prompt.contains("MISSING: <what tables"));
        assert!(prompt.contains("LIMIT 100"));
    }

    #[test]
    fn test_instruction_is_deterministic() {
        assert_eq!(build_instruction(SCHEMA), build_instruction(SCHEMA));
    }

    #[test]
    fn test_schema_text_with_braces_is_not_reinterpreted() {
        let prompt = build_instruction("TABLE: t\n  - payload: jsonb // {schema}\n");
        assert_eq!(prompt.matches("{schema}").count(), 1);
        assert!(prompt.contains("payload: jsonb // {schema}"));
    }

    #[test]
    fn test_discovery_instruction_requests_json_shape() {
        let prompt = build_discovery_instruction(SCHEMA);

        assert!(prompt.contains(SCHEMA));
        assert!(prompt.contains("\"domain\""));
        assert!(prompt.contains("\"description\""));
        assert!(prompt.contains("\"questions\""));
        assert_ne!(prompt, build_instruction(SCHEMA));
    }
}

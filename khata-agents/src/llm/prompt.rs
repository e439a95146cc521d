use crate::tools::format_amount;
use chrono::{DateTime, TimeZone};
use khata_types::Transaction;
use std::fmt::Display;

/// Instructions sent with every message. `recent` is listed most recent first
/// so the model can turn "the grocery expense" into a transaction id.
pub fn build_system_prompt<Tz>(now: &DateTime<Tz>, currency: &str, recent: &[Transaction]) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let recent_section = if recent.is_empty() {
        "No transactions recorded yet.".to_string()
    } else {
        recent
            .iter()
            .map(|tx| {
                let mut line = format!(
                    "- #{} {} {}{}",
                    tx.id,
                    tx.transaction_type,
                    currency,
                    format_amount(tx.amount)
                );
                if let Some(sub_type) = &tx.sub_type {
                    line.push_str(&format!(" ({})", sub_type));
                }
                if let Some(whom) = &tx.whom_to_paid {
                    line.push_str(&format!(" with {}", whom));
                }
                line.push_str(&format!(
                    " on {}",
                    tx.created_at
                        .with_timezone(&now.timezone())
                        .format("%Y-%m-%d %H:%M")
                ));
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are a finance assistant for farmers and small shopkeepers. Read each message and call exactly one function when it asks to record, show, change or remove money transactions. Reply with a short plain answer, without calling a function, for greetings or when the request is unclear.

## Today

{today} ({weekday}). Amounts are in {currency}.

## Transaction types

- income: money coming in (crop sales, salary, government subsidy, loan received)
- expense: money going out (seeds, fertilizer, labour, electricity, groceries, loan given)

Put the finer category in sub_type using short snake_case words such as crop_sale, salary, subsidy, fertilizer, grocery, labour. Put the other party in whom_to_paid.

## Choosing a transaction to update or delete

- Use transaction_id when the message or the recent list below identifies one transaction.
- Set latest to true for "the last transaction" or "my latest grocery expense", together with any match_* fields that describe it.
- Otherwise describe it with match_type, match_sub_type, match_whom_to_paid or match_date_filter. If that fits more than one transaction the request is rejected, so prefer an id.

## Dates

date_filter accepts: today, yesterday, this week, last week, this month, last month, all time. Weeks start on Monday. For other periods send start_date and end_date as YYYY-MM-DD.

## Examples

- "I sold 10kg tomatoes for 1200 today" -> add_transaction amount=1200, type=income, sub_type=crop_sale
- "Show me all expenses from this month" -> get_transaction type=expense, date_filter=this month
- "Update the 500 rs grocery to 600" -> update_transaction with the id of that grocery expense, amount=600
- "Delete the last transaction" -> delete_transaction latest=true

## Recent transactions

{recent_section}
"#,
        today = now.format("%Y-%m-%d"),
        weekday = now.format("%A"),
        currency = currency,
        recent_section = recent_section,
    )
}

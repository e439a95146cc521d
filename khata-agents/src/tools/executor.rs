use super::types::{
    AddTransactionArgs, DeleteTransactionArgs, GetTransactionArgs, TransactionSelector,
    UpdateTransactionArgs,
};
use super::ToolCall;
use crate::error::{ToolError, ToolResult};
use crate::filters::{
    resolve_amount_filters, resolve_custom_range, resolve_date_filter, DatePhrase,
};
use crate::storage::{TransactionQuery, TransactionStore};
use chrono::{DateTime, Local, TimeZone, Utc};
use khata_types::{
    BalanceResponse, NewTransaction, Scope, Transaction, TransactionChanges, TransactionType,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

/// What a tool reports back: a sentence for the user and the affected data
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub message: String,
    pub data: Value,
}

/// Runs the four transaction tools against a store, one scope at a time
pub struct TransactionToolExecutor {
    store: Arc<dyn TransactionStore>,
    currency_symbol: String,
}

impl TransactionToolExecutor {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self {
            store,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
        }
    }

    pub fn with_currency_symbol(mut self, currency_symbol: impl Into<String>) -> Self {
        self.currency_symbol = currency_symbol.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub async fn dispatch(&self, scope: &Scope, call: ToolCall) -> ToolResult<ToolOutcome> {
        self.dispatch_at(scope, call, &Local::now()).await
    }

    /// Runs one tool with `now` as the clock for new timestamps and date phrases
    pub async fn dispatch_at<Tz: TimeZone>(
        &self,
        scope: &Scope,
        call: ToolCall,
        now: &DateTime<Tz>,
    ) -> ToolResult<ToolOutcome> {
        tracing::debug!("Dispatching {} for {}", call.name(), scope);

        match call {
            ToolCall::Add(args) => self.add(scope, args, now).await,
            ToolCall::Get(args) => self.get(scope, args, now).await,
            ToolCall::Update(args) => self.update(scope, args, now).await,
            ToolCall::Delete(args) => self.delete(scope, args, now).await,
        }
    }

    pub async fn add<Tz: TimeZone>(
        &self,
        scope: &Scope,
        args: AddTransactionArgs,
        now: &DateTime<Tz>,
    ) -> ToolResult<ToolOutcome> {
        check_amount(args.amount)?;

        let new_transaction = NewTransaction {
            amount: args.amount,
            transaction_type: args.transaction_type,
            sub_type: non_blank(args.sub_type),
            whom_to_paid: non_blank(args.whom_to_paid),
        };

        let created = self
            .store
            .create(scope, new_transaction, now.with_timezone(&Utc))
            .await?;

        tracing::info!(
            "Recorded {} #{} of {} for {}",
            created.transaction_type,
            created.id,
            created.amount,
            scope
        );

        let mut message = format!(
            "Added {} of {}",
            created.transaction_type,
            self.money(created.amount)
        );
        if let Some(sub_type) = &created.sub_type {
            message.push_str(&format!(" ({})", sub_type));
        }
        if let Some(whom) = &created.whom_to_paid {
            let preposition = match created.transaction_type {
                TransactionType::Income => "from",
                TransactionType::Expense => "to",
            };
            message.push_str(&format!(" {} {}", preposition, whom));
        }

        Ok(ToolOutcome {
            message,
            data: to_data(&created)?,
        })
    }

    pub async fn get<Tz: TimeZone>(
        &self,
        scope: &Scope,
        args: GetTransactionArgs,
        now: &DateTime<Tz>,
    ) -> ToolResult<ToolOutcome> {
        let (query, applied) = self.listing_query(&args, now)?;
        let transactions = self.store.list(scope, &query).await?;

        let total_income = round_cents(sum_of(&transactions, TransactionType::Income));
        let total_expense = round_cents(sum_of(&transactions, TransactionType::Expense));
        let net_total = round_cents(net_of(&transactions));

        let filters = if applied.is_empty() {
            String::new()
        } else {
            format!(" with filters: {}", applied.join(", "))
        };

        let message = if transactions.is_empty() {
            format!("No transactions found{}", filters)
        } else {
            format!(
                "Found {} transaction{}{}. Total: {}",
                transactions.len(),
                if transactions.len() == 1 { "" } else { "s" },
                filters,
                self.money(net_total)
            )
        };

        Ok(ToolOutcome {
            message,
            data: json!({
                "transactions": transactions,
                "count": transactions.len(),
                "total_income": total_income,
                "total_expense": total_expense,
                "net_total": net_total,
            }),
        })
    }

    pub async fn update<Tz: TimeZone>(
        &self,
        scope: &Scope,
        args: UpdateTransactionArgs,
        now: &DateTime<Tz>,
    ) -> ToolResult<ToolOutcome> {
        let changes = TransactionChanges {
            amount: args.amount,
            sub_type: non_blank(args.sub_type),
            whom_to_paid: non_blank(args.whom_to_paid),
        };
        if let Some(amount) = changes.amount {
            check_amount(amount)?;
        }
        if changes.is_empty() {
            return Err(ToolError::validation(
                "Nothing to update: give a new amount, category or counterparty",
            ));
        }

        let target = self.resolve_target(scope, &args.selector, now).await?;
        let updated = self
            .store
            .update(scope, target.id, &changes)
            .await?
            .ok_or_else(|| missing(target.id))?;

        let mut described = Vec::new();
        if changes.amount.is_some() {
            described.push(format!(
                "amount: {} → {}",
                self.money(target.amount),
                self.money(updated.amount)
            ));
        }
        if changes.sub_type.is_some() {
            described.push(format!(
                "category: {} → {}",
                or_none(&target.sub_type),
                or_none(&updated.sub_type)
            ));
        }
        if changes.whom_to_paid.is_some() {
            described.push(format!(
                "counterparty: {} → {}",
                or_none(&target.whom_to_paid),
                or_none(&updated.whom_to_paid)
            ));
        }

        tracing::info!("Updated transaction #{} for {}", updated.id, scope);

        Ok(ToolOutcome {
            message: format!(
                "Updated transaction #{}: {}",
                updated.id,
                described.join(", ")
            ),
            data: to_data(&updated)?,
        })
    }

    pub async fn delete<Tz: TimeZone>(
        &self,
        scope: &Scope,
        args: DeleteTransactionArgs,
        now: &DateTime<Tz>,
    ) -> ToolResult<ToolOutcome> {
        let target = self.resolve_target(scope, &args.selector, now).await?;
        let removed = self
            .store
            .delete(scope, target.id)
            .await?
            .ok_or_else(|| missing(target.id))?;

        tracing::info!("Deleted transaction #{} for {}", removed.id, scope);

        let mut message = format!(
            "Deleted {} of {}",
            removed.transaction_type,
            self.money(removed.amount)
        );
        if let Some(sub_type) = &removed.sub_type {
            message.push_str(&format!(" for {}", sub_type));
        }
        message.push_str(&format!(" (ID: {})", removed.id));

        Ok(ToolOutcome {
            message,
            data: to_data(&removed)?,
        })
    }

    /// Transactions matching listing filters, most recent first
    pub async fn list_at<Tz: TimeZone>(
        &self,
        scope: &Scope,
        args: &GetTransactionArgs,
        now: &DateTime<Tz>,
    ) -> ToolResult<Vec<Transaction>> {
        let (query, _) = self.listing_query(args, now)?;
        self.store.list(scope, &query).await
    }

    /// Income, expense and net for the calendar month containing `now`
    pub async fn monthly_balance_at<Tz: TimeZone>(
        &self,
        scope: &Scope,
        now: &DateTime<Tz>,
    ) -> ToolResult<BalanceResponse>
    where
        Tz::Offset: std::fmt::Display,
    {
        let query = TransactionQuery {
            created: DatePhrase::ThisMonth.resolve(now)?,
            ..Default::default()
        };
        let transactions = self.store.list(scope, &query).await?;

        let income = round_cents(sum_of(&transactions, TransactionType::Income));
        let expense = round_cents(sum_of(&transactions, TransactionType::Expense));

        Ok(BalanceResponse {
            status: "success".to_string(),
            month: now.format("%B %Y").to_string(),
            income,
            expense,
            net_balance: round_cents(net_of(&transactions)),
        })
    }

    /// Finds the single transaction an update or delete refers to
    async fn resolve_target<Tz: TimeZone>(
        &self,
        scope: &Scope,
        selector: &TransactionSelector,
        now: &DateTime<Tz>,
    ) -> ToolResult<Transaction> {
        let latest = selector.latest.unwrap_or(false);
        let mut query = TransactionQuery {
            transaction_type: selector.match_type,
            sub_type: non_blank(selector.match_sub_type.clone()),
            whom_to_paid: non_blank(selector.match_whom_to_paid.clone()),
            ..Default::default()
        };
        if let Some(phrase) = non_blank(selector.match_date_filter.clone()) {
            query.created = resolve_date_filter(&phrase, now)?;
        }

        // An id plus a description must agree on the same row
        if let Some(id) = selector.transaction_id {
            if !query.has_criteria() {
                return self.store.get(scope, id).await?.ok_or_else(|| missing(id));
            }

            query.id = Some(id);
            let mut found = self.store.list(scope, &query).await?;
            if found.is_empty() {
                return match self.store.get(scope, id).await? {
                    Some(_) => Err(ToolError::NotFound(format!(
                        "Transaction {} does not match that description",
                        id
                    ))),
                    None => Err(missing(id)),
                };
            }
            return Ok(found.remove(0));
        }

        if !latest && !query.has_criteria() {
            return Err(ToolError::validation(
                "Say which transaction you mean: give its ID, describe it, or ask for the latest one",
            ));
        }
        if latest {
            query.limit = Some(1);
        }

        let mut candidates = self.store.list(scope, &query).await?;
        match candidates.len() {
            0 => Err(ToolError::NotFound(
                "No transaction matches that description".to_string(),
            )),
            1 => Ok(candidates.remove(0)),
            count => {
                tracing::debug!("Selector for {} matched {} transactions", scope, count);
                Err(ToolError::AmbiguousSelector { count })
            }
        }
    }

    /// Store query for listing arguments, plus a readable note per filter
    fn listing_query<Tz: TimeZone>(
        &self,
        args: &GetTransactionArgs,
        now: &DateTime<Tz>,
    ) -> ToolResult<(TransactionQuery, Vec<String>)> {
        let mut applied = Vec::new();
        let mut query = TransactionQuery {
            transaction_type: args.transaction_type,
            sub_type: non_blank(args.sub_type.clone()),
            whom_to_paid: non_blank(args.whom_to_paid.clone()),
            ..Default::default()
        };

        if let Some(kind) = query.transaction_type {
            applied.push(format!("type: {}", kind));
        }
        if let Some(sub_type) = &query.sub_type {
            applied.push(format!("category: {}", sub_type));
        }
        if let Some(whom) = &query.whom_to_paid {
            applied.push(format!("with: {}", whom));
        }

        let start_date = non_blank(args.start_date.clone());
        let end_date = non_blank(args.end_date.clone());
        match (start_date, end_date) {
            (Some(start), Some(end)) => {
                query.created = Some(resolve_custom_range(&start, &end, &now.timezone())?);
                applied.push(format!("from {} to {}", start, end));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ToolError::invalid_filter(
                    "start_date and end_date must be given together",
                ));
            }
            (None, None) => {
                if let Some(phrase) = non_blank(args.date_filter.clone()) {
                    query.created = resolve_date_filter(&phrase, now)?;
                    applied.push(format!("date: {}", phrase));
                }
            }
        }

        query.amounts = resolve_amount_filters(
            args.amount_comparison.as_deref(),
            args.amount_value,
            args.amount_min,
            args.amount_max,
        )?;
        applied.extend(
            query
                .amounts
                .iter()
                .map(|predicate| predicate.describe(&self.currency_symbol)),
        );

        if let Some(limit) = args.limit.filter(|limit| *limit > 0) {
            query.limit = Some(limit as usize);
            applied.push(format!("latest {}", limit));
        }

        Ok((query, applied))
    }

    fn money(&self, value: f64) -> String {
        if value < 0.0 {
            format!("-{}{}", self.currency_symbol, format_amount(-value))
        } else {
            format!("{}{}", self.currency_symbol, format_amount(value))
        }
    }
}

/// Two decimals with comma thousands separators, e.g. `1,200.00`
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, cents % 100)
}

fn check_amount(amount: f64) -> ToolResult<()> {
    if !amount.is_finite() {
        return Err(ToolError::validation("Amount must be a number"));
    }
    if amount < 0.0 {
        return Err(ToolError::validation(format!(
            "Amount cannot be negative, got {}",
            amount
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_none(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("none")
}

fn missing(id: i64) -> ToolError {
    ToolError::NotFound(format!("Transaction {} not found", id))
}

fn sum_of(transactions: &[Transaction], kind: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|t| t.transaction_type == kind)
        .map(|t| t.amount)
        .sum()
}

fn net_of(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(Transaction::signed_amount).sum()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_data<T: serde::Serialize>(value: &T) -> ToolResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::Storage(format!("Could not encode transaction: {}", e)))
}

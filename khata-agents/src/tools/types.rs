use crate::filters::AmountComparison;
use khata_types::TransactionType;
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddTransactionArgs {
    /// The transaction amount, a non-negative number without currency symbols
    pub amount: f64,
    /// income for money coming in (sales, salary, subsidy), expense for money going out
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Category of the transaction, e.g. grocery, salary, fertilizer, crop_sale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Person or business on the other side of the transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whom_to_paid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GetTransactionArgs {
    /// Only income or only expense transactions
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    /// Only transactions in this category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Only transactions with this person or business
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whom_to_paid: Option<String>,
    /// One of: today, yesterday, this week, last week, this month, last month, all time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_filter: Option<String>,
    /// First day of a custom range as YYYY-MM-DD; requires end_date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Last day (inclusive) of a custom range as YYYY-MM-DD; requires start_date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Compare amounts against amount_value: above, below or equal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<AmountComparison>")]
    pub amount_comparison: Option<String>,
    /// Amount used with amount_comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_value: Option<f64>,
    /// Minimum amount, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<f64>,
    /// Maximum amount, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<f64>,
    /// Return at most this many of the most recent transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Identifies the one transaction an update or delete applies to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionSelector {
    /// ID of the transaction, when known
    #[serde(
        default,
        deserialize_with = "deserialize_transaction_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_id: Option<i64>,
    /// true to pick the most recent transaction matching the match_* fields, e.g. "the last transaction"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,
    /// Match only income or only expense transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<TransactionType>,
    /// Match transactions in this category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_sub_type: Option<String>,
    /// Match transactions with this person or business
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_whom_to_paid: Option<String>,
    /// Match transactions from today, yesterday, this week, last week, this month or last month
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_date_filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateTransactionArgs {
    #[serde(flatten)]
    pub selector: TransactionSelector,
    /// New amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// New category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// New person or business
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whom_to_paid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteTransactionArgs {
    #[serde(flatten)]
    pub selector: TransactionSelector,
}

/// Providers sometimes send ids as `3.0` or `"#3"`; accept any whole number
fn deserialize_transaction_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Int(id)) => Ok(Some(id)),
        Some(RawId::Float(id)) if id.is_finite() && id.fract() == 0.0 => Ok(Some(id as i64)),
        Some(RawId::Float(id)) => Err(de::Error::custom(format!(
            "transaction_id must be a whole number, got {}",
            id
        ))),
        Some(RawId::Text(text)) => text
            .trim()
            .trim_start_matches('#')
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("transaction_id '{}' is not a number", text))),
    }
}

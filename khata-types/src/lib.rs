pub mod message;
pub mod transaction;

pub use message::{
    ActionResponse, DatabaseStatus, ErrorKind, HealthResponse, MessageResponse,
    ProcessMessageRequest, ScopeQuery, TransactionFilterQuery, UpdateAmountRequest,
};
pub use transaction::{
    BalanceResponse, NewTransaction, ParseTransactionTypeError, Scope, Transaction,
    TransactionChanges, TransactionType,
};

use khata_types::*;
use std::fs;
use std::path::PathBuf;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut types = Vec::new();

    // Transaction types
    types.push(clean_type(TransactionType::export_to_string()?));
    types.push(clean_type(Scope::export_to_string()?));
    types.push(clean_type(Transaction::export_to_string()?));
    types.push(clean_type(NewTransaction::export_to_string()?));
    types.push(clean_type(TransactionChanges::export_to_string()?));
    types.push(clean_type(BalanceResponse::export_to_string()?));

    // Message endpoint types
    types.push(clean_type(ProcessMessageRequest::export_to_string()?));
    types.push(clean_type(ErrorKind::export_to_string()?));
    types.push(clean_type(MessageResponse::export_to_string()?));

    // Direct routes
    types.push(clean_type(DatabaseStatus::export_to_string()?));
    types.push(clean_type(HealthResponse::export_to_string()?));
    types.push(clean_type(TransactionFilterQuery::export_to_string()?));
    types.push(clean_type(ScopeQuery::export_to_string()?));
    types.push(clean_type(UpdateAmountRequest::export_to_string()?));
    types.push(clean_type(ActionResponse::export_to_string()?));

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("../web/src/api-types"));
    fs::create_dir_all(&output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Everything lands in one file, so cross-type imports are dropped
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

/// Read seed rows from a CSV file with a header row. The whole file is
/// parsed before anything is returned, so a malformed row rejects the file.
pub fn read_csv<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open CSV file {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let row: T = result
            .with_context(|| format!("malformed row {} in {}", line + 2, path.display()))?;
        rows.push(row);
    }
    info!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AccountSeed, UserSeed};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_user_rows() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "users.csv",
            "full_name,birth_day,accounts\n\
             Andrey Andreev,1977-03-12,ID--k4-bfe-12363-v\n\
             Danil Danilov,,\"ID--r3-dd-32224-ja,ID--p7-cd-98236-tf\"\n",
        );

        let rows: Vec<UserSeed> = read_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].full_name, "Andrey Andreev");
        assert!(rows[1].birth_day.is_none());
        assert_eq!(rows[1].accounts, "ID--r3-dd-32224-ja,ID--p7-cd-98236-tf");
    }

    #[test]
    fn test_read_account_rows() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "accounts.csv",
            "user_id,type,number,bank_id,currency,amount,status\n\
             1,debit,ID--k4-bfe-12363-v,1,USD,7773,silver\n",
        );

        let rows: Vec<AccountSeed> = read_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account_type, "debit");
        assert_eq!(rows[0].amount, Decimal::from(7773));
    }

    #[test]
    fn test_malformed_row_rejects_file() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "accounts.csv",
            "user_id,type,number,bank_id,currency,amount,status\n\
             1,debit,ID--k4-bfe-12363-v,1,USD,not-a-number,silver\n",
        );

        let result: Result<Vec<AccountSeed>> = read_csv(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result: Result<Vec<UserSeed>> = read_csv("no/such/file.csv");
        assert!(result.is_err());
    }
}

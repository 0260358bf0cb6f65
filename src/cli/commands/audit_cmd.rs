//! `warded audit`: show recorded events for the current ward.
//!
//! Usage:
//!   warded audit                      # last 50 events in the ward
//!   warded -w work audit --since 7d   # events in `work` from the last week
//!   warded audit --name web           # events touching `web` or `web/...`
//!   warded audit --all-wards          # every ward, with a Ward column

use chrono::{DateTime, TimeDelta, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditLog, AuditQuery};
use crate::cli::{output, Context};
use crate::errors::{Result, WardedError};

/// Filters taken from the command line.
#[derive(Debug, Default)]
pub struct AuditArgs<'a> {
    pub last: usize,
    pub since: Option<&'a str>,
    pub name: Option<&'a str>,
    pub all_wards: bool,
}

/// Execute the `audit` command.
pub fn execute(ctx: &Context, args: &AuditArgs<'_>) -> Result<()> {
    let query = build_query(&ctx.ward_name, args)?;

    let entries = if AuditLog::db_path(&ctx.data_root).exists() {
        AuditLog::open(&ctx.data_root)
            .ok_or_else(|| WardedError::AuditError("failed to open audit database".into()))?
            .query(&query)?
    } else {
        Vec::new()
    };

    if entries.is_empty() {
        if args.all_wards {
            output::info("No audit entries found.");
        } else {
            output::info(&format!("No audit entries for ward '{}'.", ctx.ward_name));
        }
        return Ok(());
    }

    let heading = if args.all_wards {
        format!("{} audit entries across all wards:", entries.len())
    } else {
        format!("{} audit entries in ward '{}':", entries.len(), ctx.ward_name)
    };
    println!("{}", style(heading).bold());
    println!("{}", audit_table(&entries, args.all_wards));

    Ok(())
}

fn build_query(ward: &str, args: &AuditArgs<'_>) -> Result<AuditQuery> {
    let mut query = AuditQuery::new(args.last);
    if !args.all_wards {
        query = query.ward(ward);
    }
    if let Some(name) = args.name {
        query = query.secret(name);
    }
    if let Some(since) = args.since {
        query = query.since(Utc::now() - parse_age(since)?);
    }
    Ok(query)
}

/// Parse an age like `90s`, `30m`, `24h`, `7d` or `2w`.
fn parse_age(input: &str) -> Result<TimeDelta> {
    let input = input.trim();
    let invalid = |why: &str| {
        WardedError::CommandFailed(format!(
            "invalid duration '{input}' ({why}), use a format like 30m, 24h, 7d or 2w"
        ))
    };

    let unit_at = input
        .char_indices()
        .last()
        .map(|(i, _)| i)
        .ok_or_else(|| invalid("empty"))?;
    let (number, unit) = input.split_at(unit_at);
    let n: i64 = number.parse().map_err(|_| invalid("not a number"))?;
    if n < 0 {
        return Err(invalid("negative"));
    }

    let delta = match unit {
        "s" => TimeDelta::try_seconds(n),
        "m" => TimeDelta::try_minutes(n),
        "h" => TimeDelta::try_hours(n),
        "d" => TimeDelta::try_days(n),
        "w" => TimeDelta::try_weeks(n),
        _ => return Err(invalid("unknown unit")),
    };
    let delta = delta.ok_or_else(|| invalid("too large"))?;

    // The subtraction in `build_query` must stay in range too.
    Utc::now()
        .checked_sub_signed(delta)
        .map(|_| delta)
        .ok_or_else(|| invalid("too large"))
}

fn audit_table(entries: &[AuditEntry], with_ward: bool) -> Table {
    let mut header = vec!["Time", "Operation"];
    if with_ward {
        header.push("Ward");
    }
    header.extend(["Passphrase", "Details"]);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);

    for entry in entries {
        let mut row = vec![
            local_time(entry.timestamp),
            colorize_operation(&entry.operation),
        ];
        if with_ward {
            row.push(entry.ward.clone());
        }
        row.push(passphrase_cell(entry));
        row.push(entry.details.clone().unwrap_or_else(|| "-".into()));
        table.add_row(row);
    }
    table
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// `name`, or `from -> to` for moves and copies.
fn passphrase_cell(entry: &AuditEntry) -> String {
    match (&entry.secret_name, &entry.target) {
        (Some(from), Some(to)) => format!("{from} -> {to}"),
        (Some(name), None) => name.clone(),
        (None, _) => "-".into(),
    }
}

fn colorize_operation(op: &str) -> String {
    match op {
        "generate" | "copy" => style(op).green().to_string(),
        "edit" | "move" => style(op).blue().to_string(),
        "remove" | "rekey-incomplete" => style(op).red().bold().to_string(),
        "rekey" => style(op).yellow().to_string(),
        "show" | "data" => style(op).cyan().to_string(),
        "grep" => style(op).magenta().to_string(),
        _ => op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ward::WardEvent;

    #[test]
    fn ages_in_every_unit() {
        assert_eq!(parse_age("90s").unwrap(), TimeDelta::seconds(90));
        assert_eq!(parse_age("30m").unwrap(), TimeDelta::minutes(30));
        assert_eq!(parse_age(" 24h ").unwrap(), TimeDelta::hours(24));
        assert_eq!(parse_age("7d").unwrap(), TimeDelta::days(7));
        assert_eq!(parse_age("2w").unwrap(), TimeDelta::days(14));
        assert_eq!(parse_age("0d").unwrap(), TimeDelta::zero());
    }

    #[test]
    fn bad_ages_are_errors() {
        for input in ["", "abc", "7x", "d", "-3d", "7dd", "3.5h"] {
            assert!(parse_age(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn huge_ages_are_errors_not_panics() {
        assert!(parse_age("9223372036854775807d").is_err());
        assert!(parse_age("99999999999w").is_err());
        assert!(parse_age("999999999d").is_err());
    }

    #[test]
    fn query_defaults_to_the_current_ward() {
        let dir = tempfile::TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        audit.record("default", &WardEvent::Edit { name: "email" });
        audit.record("work", &WardEvent::Edit { name: "vpn" });
        audit.record("work", &WardEvent::Remove { name: "old/vpn" });

        let args = AuditArgs { last: 50, ..Default::default() };
        let work = audit.query(&build_query("work", &args).unwrap()).unwrap();
        assert_eq!(work.len(), 2);

        let args = AuditArgs { last: 50, name: Some("old"), ..Default::default() };
        let old = audit.query(&build_query("work", &args).unwrap()).unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].operation, "remove");

        let args = AuditArgs { last: 50, all_wards: true, since: Some("1h"), ..Default::default() };
        assert_eq!(audit.query(&build_query("work", &args).unwrap()).unwrap().len(), 3);
    }

    #[test]
    fn ward_column_only_across_wards() {
        let dir = tempfile::TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        audit.record("work", &WardEvent::Move { from: "a", to: "b" });
        let entries = audit.query(&AuditQuery::new(1)).unwrap();

        assert_eq!(passphrase_cell(&entries[0]), "a -> b");

        let single = audit_table(&entries, false).to_string();
        let across = audit_table(&entries, true).to_string();
        assert!(!single.contains("Ward"));
        assert!(across.contains("Ward"));
        assert!(across.contains("work"));
    }
}

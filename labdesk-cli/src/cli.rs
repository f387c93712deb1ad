//! Command line surface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use lab_api::models::{ExpenseCategory, Gender, ReportStatus};
use std::path::PathBuf;

/// LabDesk front-desk and admin console
#[derive(Parser, Debug)]
#[command(name = "labdesk", version)]
#[command(about = "Diagnostic lab front desk: patients, test orders, results and reports")]
pub struct Cli {
    /// Backend base URL, overriding labdesk.toml
    #[arg(long, global = true, env = "LABDESK_API_BASE_URL")]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Stored session file (defaults to the user config directory)
    #[arg(long, global = true, env = "LABDESK_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "LABDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and forget the session
    Logout,
    #[command(subcommand)]
    Patients(PatientCommand),
    #[command(subcommand)]
    Doctors(DoctorCommand),
    #[command(subcommand)]
    Tests(TestCommand),
    #[command(subcommand)]
    Orders(OrderCommand),
    #[command(subcommand)]
    Report(ReportCommand),
    #[command(subcommand)]
    Expenses(ExpenseCommand),
    /// Headline figures for the logged-in role
    Dashboard,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = lab_api::pagination::DEFAULT_PAGE_SIZE)]
    pub limit: u32,
}

#[derive(Subcommand, Debug)]
pub enum PatientCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        status: Option<ReportStatusArg>,
    },
    Register(RegisterArgs),
    Show {
        id: String,
        /// Include previous test orders
        #[arg(long)]
        history: bool,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub age: u32,
    #[arg(long, value_enum)]
    pub gender: GenderArg,
    #[arg(long)]
    pub address: String,
}

#[derive(Subcommand, Debug)]
pub enum DoctorCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TestCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        category: Option<String>,
        /// Only tests that can be ordered
        #[arg(long)]
        active: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    /// Orders waiting for results or a report
    Pending,
    /// Assign tests to a patient and create the bill
    Assign {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        doctor: String,
        /// Catalog test ids
        #[arg(long = "test", required = true)]
        tests: Vec<String>,
    },
    /// Enter results for one test item
    Result {
        order: String,
        item: String,
        /// Parameter values as NAME=VALUE
        #[arg(value_parser = parse_assignment)]
        values: Vec<(String, String)>,
        /// Scanned report or instrument printout
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Enter results for several items at once
    Bulk {
        order: String,
        /// Values as ITEM:NAME=VALUE
        #[arg(required = true, value_parser = parse_bulk_value)]
        values: Vec<BulkArg>,
    },
    /// Generate the report once every result is in
    Finalize { order: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkArg {
    pub item: String,
    pub parameter: String,
    pub value: String,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    Show { order: String },
    Pdf {
        order: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Email the report, to the patient's address unless one is given
    Send {
        order: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, value_enum)]
        category: Option<ExpenseCategoryArg>,
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
        #[arg(long)]
        to: Option<chrono::NaiveDate>,
    },
    /// Monthly PDF; the month comes from --from, then the latest expense, then today
    ExportMonthly {
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    ExportYearly {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderArg {
    Male,
    Female,
    Other,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => Self::Male,
            GenderArg::Female => Self::Female,
            GenderArg::Other => Self::Other,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatusArg {
    Pending,
    Generated,
    Sent,
    Failed,
}

impl From<ReportStatusArg> for ReportStatus {
    fn from(arg: ReportStatusArg) -> Self {
        match arg {
            ReportStatusArg::Pending => Self::Pending,
            ReportStatusArg::Generated => Self::Generated,
            ReportStatusArg::Sent => Self::Sent,
            ReportStatusArg::Failed => Self::Failed,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseCategoryArg {
    LabMaterials,
    Salary,
    Commission,
    Utility,
    Rent,
    Miscellaneous,
}

impl From<ExpenseCategoryArg> for ExpenseCategory {
    fn from(arg: ExpenseCategoryArg) -> Self {
        match arg {
            ExpenseCategoryArg::LabMaterials => Self::LabMaterials,
            ExpenseCategoryArg::Salary => Self::Salary,
            ExpenseCategoryArg::Commission => Self::Commission,
            ExpenseCategoryArg::Utility => Self::Utility,
            ExpenseCategoryArg::Rent => Self::Rent,
            ExpenseCategoryArg::Miscellaneous => Self::Miscellaneous,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_bulk_value(raw: &str) -> Result<BulkArg, String> {
    let (item, rest) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ITEM:NAME=VALUE, got '{raw}'"))?;
    let (parameter, value) = parse_assignment(rest)?;
    if item.trim().is_empty() {
        return Err(format!("missing test item in '{raw}'"));
    }
    Ok(BulkArg {
        item: item.trim().to_string(),
        parameter,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_values() {
        let cli = Cli::try_parse_from([
            "labdesk", "orders", "result", "o-1", "t-1", "Hemoglobin=13.5", "WBC = 7000",
        ])
        .unwrap();
        let Command::Orders(OrderCommand::Result { values, file, .. }) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(
            values,
            vec![
                ("Hemoglobin".to_string(), "13.5".to_string()),
                ("WBC".to_string(), "7000".to_string())
            ]
        );
        assert!(file.is_none());
    }

    #[test]
    fn test_parse_bulk_values() {
        let cli = Cli::try_parse_from(["labdesk", "orders", "bulk", "o-1", "t-1:Hemoglobin=13.5"]).unwrap();
        let Command::Orders(OrderCommand::Bulk { values, .. }) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(
            values,
            vec![BulkArg {
                item: "t-1".to_string(),
                parameter: "Hemoglobin".to_string(),
                value: "13.5".to_string(),
            }]
        );
        assert!(Cli::try_parse_from(["labdesk", "orders", "bulk", "o-1", "Hemoglobin=13.5"]).is_err());
    }

    #[test]
    fn test_assign_requires_tests() {
        assert!(Cli::try_parse_from(["labdesk", "orders", "assign", "--patient", "p", "--doctor", "d"]).is_err());
        let cli = Cli::try_parse_from([
            "labdesk", "orders", "assign", "--patient", "p", "--doctor", "d", "--test", "cbc", "--test", "lipid",
        ])
        .unwrap();
        let Command::Orders(OrderCommand::Assign { tests, .. }) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(tests, vec!["cbc", "lipid"]);
    }

    #[test]
    fn test_value_enums_map_to_models() {
        let cli = Cli::try_parse_from(["labdesk", "expenses", "list", "--category", "lab-materials"]).unwrap();
        let Command::Expenses(ExpenseCommand::List { category, page, .. }) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(category.map(ExpenseCategory::from), Some(ExpenseCategory::LabMaterials));
        assert_eq!(page.page, 1);
        assert_eq!(Gender::from(GenderArg::Female), Gender::Female);
    }

    #[test]
    fn test_delete_flag_defaults_off() {
        let cli = Cli::try_parse_from(["labdesk", "patients", "delete", "p-1"]).unwrap();
        assert!(matches!(cli.command, Command::Patients(PatientCommand::Delete { yes: false, .. })));
    }
}

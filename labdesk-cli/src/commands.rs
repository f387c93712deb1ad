//! One handler per subcommand.
//!
//! Handlers drive the same services, workflows and tables a screen would.
//! Operator-visible failures are toasted where they happen and come back
//! here as [`Reported`], so `main` only sets the exit code.

use crate::cli::{
    BulkArg, Command, DoctorCommand, ExpenseCommand, OrderCommand, PageArgs, PatientCommand, RegisterArgs,
    ReportCommand, TestCommand,
};
use crate::output::{page_footer, ConsoleNotifier, Table};
use crate::session_store::FileSessionStore;
use anyhow::Context;
use api_client::{ApiClient, ClientConfig, Download, SessionEvent};
use chrono::{Datelike, Local};
use data_provider::{Confirmation, DataProvider, ResourceTable};
use error_common::{ErrorReporter, UserFacing};
use lab_api::catalog::LabTestFilter;
use lab_api::doctors::DoctorFilter;
use lab_api::expenses::{resolve_report_period, ExpenseFilter};
use lab_api::models::{Gender, TestOrder};
use lab_api::orders::Attachment;
use lab_api::patients::{PatientFilter, PatientForm};
use lab_api::reports::render_report_text;
use lab_api::{LabApi, ListQuery, Page, ReadResource};
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use workflow_engine::{
    AssignmentDraft, BulkResultDraft, OrderProgress, PendingOrders, ResultDraft, ResultEntry, ResultOutcome,
    TestAssignment,
};

/// The failure has already been shown to the operator.
#[derive(Error, Debug)]
#[error("{operation} failed")]
pub struct Reported {
    pub operation: String,
}

impl Reported {
    fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

pub type CommandResult = anyhow::Result<()>;

pub struct App {
    api: LabApi,
    reporter: ErrorReporter,
    store: FileSessionStore,
}

impl App {
    /// # Errors
    ///
    /// Unreadable session file or invalid client configuration.
    pub fn new(config: ClientConfig, store: FileSessionStore) -> anyhow::Result<Self> {
        let session = store.load()?;
        let client = ApiClient::new(config, session).context("Failed to create API client")?;
        Ok(Self {
            api: LabApi::new(client),
            reporter: ErrorReporter::new(Arc::new(ConsoleNotifier)),
            store,
        })
    }

    /// Run one command, then persist whatever the session became (a 401
    /// clears it).
    ///
    /// # Errors
    ///
    /// [`Reported`] for toasted failures, anything else for local problems.
    pub async fn run(&self, command: Command) -> CommandResult {
        let mut events = self.api.session().subscribe();
        let result = self.dispatch(command).await;
        while let Ok(event) = events.try_recv() {
            if event == SessionEvent::Expired {
                self.reporter.warning("Session expired. Run `labdesk login` again.");
            }
        }
        self.store.save(self.api.session())?;
        result
    }

    async fn dispatch(&self, command: Command) -> CommandResult {
        let command = match command {
            Command::Login { email, password } => return self.login(&email, password).await,
            Command::Logout => return self.logout().await,
            other => other,
        };

        if !self.api.session().is_authenticated() {
            self.reporter.warning("Not logged in. Run `labdesk login` first.");
            return Err(Reported::new("authenticate").into());
        }

        match command {
            Command::Patients(cmd) => self.patients(cmd).await,
            Command::Doctors(cmd) => self.doctors(cmd).await,
            Command::Tests(cmd) => self.tests(cmd).await,
            Command::Orders(cmd) => self.orders(cmd).await,
            Command::Report(cmd) => self.report(cmd).await,
            Command::Expenses(cmd) => self.expenses(cmd).await,
            Command::Dashboard => self.dashboard().await,
            Command::Login { .. } | Command::Logout => Ok(()),
        }
    }

    fn surface<T, E: UserFacing>(&self, operation: &str, result: Result<T, E>) -> Result<T, Reported> {
        result.map_err(|e| {
            self.reporter.report(operation, &e);
            Reported::new(operation)
        })
    }

    async fn login(&self, email: &str, password: Option<String>) -> CommandResult {
        let password = match password {
            Some(password) => password,
            None => read_password_line()?,
        };
        let user = self.surface(
            "login",
            self.api.auth.login(email, &SecretString::new(password)).await,
        )?;
        self.reporter
            .success(format!("Logged in as {} ({:?})", user.name, user.role));
        Ok(())
    }

    async fn logout(&self) -> CommandResult {
        self.api.auth.logout().await;
        self.store.clear()?;
        self.reporter.success("Logged out");
        Ok(())
    }

    fn table<R: ReadResource>(&self, resource: R, page: PageArgs) -> ResourceTable<R> {
        ResourceTable::new(resource, self.reporter.clone(), page.limit)
    }

    /// First page with `filter`, then the requested page when it is not 1.
    async fn load_page<R: ReadResource>(
        &self,
        table: &mut ResourceTable<R>,
        filter: R::Filter,
        page: u32,
    ) -> Result<Page<R::Item>, Reported> {
        let mut loaded = table.set_filter(filter).await.map_err(|_| Reported::new("load list"))?;
        if page > 1 {
            loaded = table.go_to_page(page).await.map_err(|_| Reported::new("load list"))?;
        }
        Ok(loaded)
    }

    async fn patients(&self, cmd: PatientCommand) -> CommandResult {
        match cmd {
            PatientCommand::List { page, search, status } => {
                let mut table = self.table(self.api.patients.clone(), page);
                let filter = PatientFilter {
                    search,
                    report_status: status.map(Into::into),
                };
                let loaded = self.load_page(&mut table, filter, page.page).await?;
                let mut out = Table::new(["ID", "Name", "Phone", "Age", "Gender", "Report"]);
                for p in &loaded.items {
                    out.row([
                        p.id.clone(),
                        p.full_name.clone(),
                        p.phone.clone(),
                        p.age.to_string(),
                        format!("{:?}", p.gender),
                        format!("{:?}", p.report_status),
                    ]);
                }
                out.print("No patients found");
                println!("{}", page_footer(loaded.page, loaded.total_pages, loaded.total));
            }
            PatientCommand::Register(args) => {
                let table = self.table(self.api.patients.clone(), PageArgs::default_page());
                let patient = table
                    .create(&register_form(args))
                    .await
                    .map_err(|_| Reported::new("register patient"))?;
                println!("{} {}", patient.id, patient.full_name);
            }
            PatientCommand::Show { id, history } => {
                let patient = self.surface("load patient", self.api.patients.get(&id).await)?;
                println!("{}  {}", patient.id, patient.full_name);
                println!("Phone:   {}", patient.phone);
                if let Some(email) = &patient.email {
                    println!("Email:   {email}");
                }
                println!("Age:     {} ({:?})", patient.age, patient.gender);
                println!("Address: {}", patient.address);
                println!("Report:  {:?}", patient.report_status);

                if history {
                    let orders = self.surface("load history", self.api.patients.history(&id).await)?;
                    println!();
                    let mut out = Table::new(["Order", "Date", "Tests", "Status", "Total"]);
                    for order in &orders {
                        out.row([
                            order.id.clone(),
                            order
                                .order_date
                                .map(|d| d.format("%Y-%m-%d").to_string())
                                .unwrap_or_default(),
                            order.tests.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", "),
                            format!("{:?}", order.overall_status),
                            money(order.total_price()),
                        ]);
                    }
                    out.print("No previous test orders");
                }
            }
            PatientCommand::Delete { id, yes } => {
                let table = self.table(self.api.patients.clone(), PageArgs::default_page());
                let confirmation = if yes {
                    Confirmation::Confirmed
                } else {
                    Confirmation::Declined
                };
                let deleted = table
                    .delete(&id, confirmation)
                    .await
                    .map_err(|_| Reported::new("delete patient"))?;
                if !deleted {
                    self.reporter
                        .info("Deleting a patient cannot be undone; pass --yes to confirm");
                }
            }
        }
        Ok(())
    }

    async fn doctors(&self, cmd: DoctorCommand) -> CommandResult {
        let DoctorCommand::List { page, search } = cmd;
        let mut table = self.table(self.api.doctors.clone(), page);
        let filter = DoctorFilter {
            search,
            ..DoctorFilter::default()
        };
        let loaded = self.load_page(&mut table, filter, page.page).await?;
        let mut out = Table::new(["ID", "Name", "Specialization", "Mobile", "Commission"]);
        for d in &loaded.items {
            out.row([
                d.id.clone(),
                d.name.clone(),
                d.specialization.clone(),
                d.mobile.clone(),
                format!("{}%", d.commission_percentage.normalize()),
            ]);
        }
        out.print("No doctors found");
        println!("{}", page_footer(loaded.page, loaded.total_pages, loaded.total));
        Ok(())
    }

    async fn tests(&self, cmd: TestCommand) -> CommandResult {
        let TestCommand::List { page, category, active } = cmd;
        let mut table = self.table(self.api.catalog.clone(), page);
        let base = if active {
            LabTestFilter::active()
        } else {
            LabTestFilter::default()
        };
        let filter = LabTestFilter { category, ..base };
        let loaded = self.load_page(&mut table, filter, page.page).await?;
        let mut out = Table::new(["ID", "Name", "Category", "Price", "Parameters", "Status"]);
        for t in &loaded.items {
            out.row([
                t.id.clone(),
                t.name.clone(),
                t.category.clone(),
                money(t.price),
                t.parameters.len().to_string(),
                format!("{:?}", t.status),
            ]);
        }
        out.print("No tests found");
        println!("{}", page_footer(loaded.page, loaded.total_pages, loaded.total));
        Ok(())
    }

    async fn orders(&self, cmd: OrderCommand) -> CommandResult {
        match cmd {
            OrderCommand::Pending => {
                let pending = PendingOrders::new(self.api.clone(), self.reporter.clone());
                let rows = pending.refresh().await.map_err(|_| Reported::new("load pending orders"))?;
                let mut out = Table::new(["Order", "Patient", "Doctor", "Progress", "Next step"]);
                for row in &rows {
                    out.row([
                        row.order.id.clone(),
                        row.order.patient_id.display_name().to_string(),
                        row.order.doctor_id.display_name().to_string(),
                        format!("{}/{}", row.progress.completed, row.progress.total),
                        row.action.label().to_string(),
                    ]);
                }
                out.print("No pending orders");
            }
            OrderCommand::Assign { patient, doctor, tests } => self.assign(patient, &doctor, &tests).await?,
            OrderCommand::Result {
                order,
                item,
                values,
                file,
            } => self.enter_result(&order, &item, values, file.as_deref()).await?,
            OrderCommand::Bulk { order, values } => self.enter_bulk(&order, values).await?,
            OrderCommand::Finalize { order } => {
                let pending = PendingOrders::new(self.api.clone(), self.reporter.clone());
                pending
                    .finalize(&order)
                    .await
                    .map_err(|_| Reported::new("generate report"))?;
            }
        }
        Ok(())
    }

    async fn assign(&self, patient: String, doctor: &str, tests: &[String]) -> CommandResult {
        let mut draft = AssignmentDraft::new(patient);
        draft.select_doctor(doctor);
        for id in tests {
            let test = self.surface("load test", self.api.catalog.get(id).await)?;
            self.surface("assign tests", draft.add_test(test))?;
        }

        let assignment = TestAssignment::new(self.api.clone(), self.reporter.clone());
        let order = assignment
            .submit(&draft)
            .await
            .map_err(|_| Reported::new("assign tests"))?;

        let mut out = Table::new(["Test", "Price"]);
        for test in draft.selected() {
            out.row([test.name.clone(), money(test.price)]);
        }
        out.row(["Total".to_string(), money(draft.invoice_total())]);
        out.print("No tests selected");
        println!("Order {}", order.id);
        Ok(())
    }

    /// Loads the order and the patient's gender, which selects reference ranges.
    async fn order_with_gender(&self, order_id: &str) -> Result<(TestOrder, Option<Gender>), Reported> {
        let order = self.surface("load order", self.api.orders.get(order_id).await)?;
        let gender = match self.api.patients.get(&order.patient_id.id).await {
            Ok(patient) => Some(patient.gender),
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Patient unavailable, reference ranges not applied");
                None
            }
        };
        Ok((order, gender))
    }

    async fn enter_result(
        &self,
        order_id: &str,
        item: &str,
        values: Vec<(String, String)>,
        file: Option<&Path>,
    ) -> CommandResult {
        let (order, gender) = self.order_with_gender(order_id).await?;
        let mut draft = self.surface("enter result", ResultDraft::for_test(&order, item, gender))?;
        for (name, value) in values {
            self.surface("enter result", draft.set_value(&name, value))?;
        }
        if let Some(path) = file {
            draft.attach(read_attachment(path)?);
        }

        for input in draft.out_of_range() {
            self.reporter.warning(format!(
                "{} = {} {} is outside {}",
                input.name,
                input.value,
                input.unit,
                input.range.as_ref().map(ToString::to_string).unwrap_or_default()
            ));
        }

        let entry = ResultEntry::new(self.api.clone(), self.reporter.clone());
        let outcome = entry
            .submit(&draft)
            .await
            .map_err(|_| Reported::new("submit result"))?;
        print_outcome(&outcome);
        Ok(())
    }

    async fn enter_bulk(&self, order_id: &str, values: Vec<BulkArg>) -> CommandResult {
        let (order, gender) = self.order_with_gender(order_id).await?;
        let mut draft = BulkResultDraft::for_order(&order, gender);
        for value in values {
            self.surface(
                "enter results",
                draft.set_value(&value.item, &value.parameter, value.value),
            )?;
        }

        let entry = ResultEntry::new(self.api.clone(), self.reporter.clone());
        let outcome = entry
            .submit_bulk(&draft)
            .await
            .map_err(|_| Reported::new("submit bulk results"))?;
        print_outcome(&outcome);
        Ok(())
    }

    async fn report(&self, cmd: ReportCommand) -> CommandResult {
        match cmd {
            ReportCommand::Show { order } => {
                let report = self.surface("load report", self.api.reports.get(&order).await)?;
                println!("{}", render_report_text(&report));
            }
            ReportCommand::Pdf { order, out } => {
                let download = self.surface("download report", self.api.reports.pdf(&order).await)?;
                let path = save_download(&download, out, &format!("report-{order}.pdf"), Path::new("."))?;
                self.reporter.success(format!("Report saved to {}", path.display()));
            }
            ReportCommand::Send { order, email } => {
                self.surface("send report", self.api.reports.send(&order, email.as_deref()).await)?;
                self.reporter.success("Report sent");
            }
        }
        Ok(())
    }

    async fn expenses(&self, cmd: ExpenseCommand) -> CommandResult {
        match cmd {
            ExpenseCommand::List {
                page,
                category,
                from,
                to,
            } => {
                let mut table = self.table(self.api.expenses.clone(), page);
                let filter = ExpenseFilter {
                    category: category.map(Into::into),
                    start_date: from,
                    end_date: to,
                };
                let loaded = self.load_page(&mut table, filter, page.page).await?;
                let mut out = Table::new(["Date", "Title", "Category", "Amount", "Supplier / Doctor"]);
                for e in &loaded.items {
                    let party = e
                        .supplier
                        .clone()
                        .or_else(|| e.doctor.as_ref().map(|d| d.display_name().to_string()))
                        .unwrap_or_default();
                    out.row([
                        e.date.to_string(),
                        e.title.clone(),
                        format!("{:?}", e.category),
                        money(e.amount),
                        party,
                    ]);
                }
                out.print("No expenses found");
                println!("{}", page_footer(loaded.page, loaded.total_pages, loaded.total));
            }
            ExpenseCommand::ExportMonthly { from, out } => {
                let filter = ExpenseFilter {
                    start_date: from,
                    ..ExpenseFilter::default()
                };
                let rows = if filter.is_empty() {
                    self.surface(
                        "load expenses",
                        self.api.expenses.list(ListQuery::default(), &filter).await,
                    )?
                    .items
                } else {
                    Vec::new()
                };
                let period = resolve_report_period(&filter, &rows, Local::now().date_naive());
                debug!(%period, "Exporting monthly expenses");
                let download = self.surface("export expenses", self.api.expenses.export_monthly(period).await)?;
                let path = save_download(&download, out, &format!("expenses-{period}.pdf"), Path::new("."))?;
                self.reporter.success(format!("Expense report saved to {}", path.display()));
            }
            ExpenseCommand::ExportYearly { year, out } => {
                let year = year.unwrap_or_else(|| Local::now().year());
                let download = self.surface("export expenses", self.api.expenses.export_yearly(year).await)?;
                let path = save_download(&download, out, &format!("expenses-{year}.pdf"), Path::new("."))?;
                self.reporter.success(format!("Expense report saved to {}", path.display()));
            }
        }
        Ok(())
    }

    async fn dashboard(&self) -> CommandResult {
        let provider = self.surface(
            "load dashboard",
            DataProvider::for_session(self.api.clone(), self.reporter.clone()),
        )?;
        let summary = self.surface("load dashboard", provider.refresh_data().await)?;
        let metrics = provider.metrics();

        if let Some(lab) = provider.lab_config() {
            println!("{}\n", lab.lab_name);
        }
        let mut out = Table::new(["Metric", "Value"]);
        out.row(["Patients".to_string(), metrics.total_patients.to_string()])
            .row(["Doctors".to_string(), metrics.total_doctors.to_string()])
            .row(["Active tests".to_string(), metrics.active_tests.to_string()])
            .row(["Pending reports".to_string(), metrics.pending_reports.to_string()]);
        if provider.role() == api_client::Role::Admin {
            out.row(["Revenue (total)".to_string(), money(metrics.total_revenue)])
                .row(["Revenue (this month)".to_string(), money(metrics.current_month_revenue)])
                .row(["Expenses (total)".to_string(), money(metrics.total_expenses)])
                .row(["Expenses (this month)".to_string(), money(metrics.current_month_expenses)])
                .row(["Commission".to_string(), money(metrics.total_commission)])
                .row(["Net profit".to_string(), money(metrics.net_profit)]);
        }
        out.print("Nothing loaded");

        provider.shutdown();
        if summary.failed.is_empty() {
            Ok(())
        } else {
            Err(Reported::new("load dashboard").into())
        }
    }
}

impl PageArgs {
    fn default_page() -> Self {
        Self {
            page: 1,
            limit: lab_api::pagination::DEFAULT_PAGE_SIZE,
        }
    }
}

fn register_form(args: RegisterArgs) -> PatientForm {
    PatientForm {
        full_name: args.name,
        phone: args.phone,
        email: args.email,
        age: args.age,
        gender: args.gender.into(),
        address: args.address,
        date_of_birth: None,
    }
}

fn money(amount: Decimal) -> String {
    format!("₹{}", amount.round_dp(2).normalize())
}

fn print_outcome(outcome: &ResultOutcome) {
    let progress = OrderProgress::of(&outcome.order);
    println!(
        "Order {}: {}/{} tests completed",
        outcome.order.id, progress.completed, progress.total
    );
    if let Some(report) = &outcome.report {
        println!("\n{}", render_report_text(report));
    }
}

fn read_password_line() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    Ok(Attachment {
        file_name,
        content_type: content_type_for(path).to_string(),
        bytes,
    })
}

/// Writes to `out` when given, else to the suggested name inside `dir`.
fn save_download(download: &Download, out: Option<PathBuf>, fallback: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = out.unwrap_or_else(|| dir.join(download.file_name_or(fallback)));
    std::fs::write(&path, &download.bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::new(135_000, 2)), "₹1350");
        assert_eq!(money(Decimal::new(12_346, 3)), "₹12.35");
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for(Path::new("scan.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("slide.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("raw")), "application/octet-stream");
    }

    #[test]
    fn test_download_falls_back_to_name() {
        let dir = std::env::temp_dir().join(format!("labdesk-dl-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let download = Download {
            bytes: b"%PDF".to_vec(),
            file_name: None,
            content_type: Some("application/pdf".to_string()),
        };
        let path = save_download(&download, Some(dir.join("out.pdf")), "report-o-1.pdf", &dir).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_download_stays_inside_target_dir() {
        let dir = std::env::temp_dir().join(format!("labdesk-dl-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let download = Download {
            bytes: b"%PDF".to_vec(),
            file_name: Some("../x.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
        };
        let path = save_download(&download, None, "report-o-1.pdf", &dir).unwrap();
        assert_eq!(path, dir.join("x.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");
        let _ = std::fs::remove_dir_all(dir);
    }
}

//! Wire models for the lab backend.
//!
//! Field names follow the backend's camelCase JSON. Ids are opaque strings;
//! `_id` is accepted wherever `id` is expected.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(alias = "male", alias = "MALE")]
    Male,
    #[serde(alias = "female", alias = "FEMALE")]
    Female,
    #[serde(alias = "other", alias = "OTHER")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Generated,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(alias = "_id")]
    pub id: String,
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "flexible_date::option")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub report_status: ReportStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "phone")]
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "commission")]
    pub commission_percentage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CatalogStatus {
    #[default]
    #[serde(alias = "active", alias = "ACTIVE")]
    Active,
    #[serde(alias = "inactive", alias = "INACTIVE")]
    Inactive,
}

/// Which patients a reference range applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RangeGender {
    #[serde(alias = "male", alias = "MALE")]
    Male,
    #[serde(alias = "female", alias = "FEMALE")]
    Female,
    #[serde(alias = "other", alias = "OTHER")]
    Other,
    #[default]
    #[serde(alias = "all", alias = "ALL", alias = "Any", alias = "any", alias = "Both")]
    All,
}

impl RangeGender {
    pub fn applies_to(self, gender: Gender) -> bool {
        matches!(
            (self, gender),
            (Self::All, _)
                | (Self::Male, Gender::Male)
                | (Self::Female, Gender::Female)
                | (Self::Other, Gender::Other)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRange {
    #[serde(default)]
    pub gender: RangeGender,
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl std::fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestParameter {
    #[serde(alias = "parameterName")]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub reference_ranges: Vec<ReferenceRange>,
}

impl TestParameter {
    /// Most specific range for `gender`: an exact match beats `All`.
    pub fn range_for(&self, gender: Gender) -> Option<&ReferenceRange> {
        self.reference_ranges
            .iter()
            .find(|r| r.gender != RangeGender::All && r.gender.applies_to(gender))
            .or_else(|| self.reference_ranges.iter().find(|r| r.gender == RangeGender::All))
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTest {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "testName")]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub status: CatalogStatus,
    #[serde(default)]
    pub parameters: Vec<TestParameter>,
}

impl LabTest {
    pub fn is_active(&self) -> bool {
        self.status == CatalogStatus::Active
    }
}

/// Id of a related record, optionally populated by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub id: String,
    pub name: Option<String>,
}

impl EntityRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Id(String),
            Embedded {
                #[serde(alias = "_id")]
                id: String,
                #[serde(default, alias = "fullName")]
                name: Option<String>,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Id(id) => Self { id, name: None },
            Wire::Embedded { id, name } => Self { id, name },
        })
    }
}

/// Status of one test inside an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// Backend roll-up of an order; never trusted alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub parameter_name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub reference_range: Option<String>,
}

/// Snapshot of a catalog test embedded in an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTest {
    /// Id of this item within the order
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "test")]
    pub test_id: Option<EntityRef>,
    #[serde(alias = "testName")]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default)]
    pub parameters: Vec<TestParameter>,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOrder {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "patient")]
    pub patient_id: EntityRef,
    #[serde(alias = "doctor")]
    pub doctor_id: EntityRef,
    #[serde(default)]
    pub tests: Vec<OrderTest>,
    #[serde(default)]
    pub overall_status: OrderStatus,
    #[serde(default, alias = "createdAt")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "bill")]
    pub bill_id: Option<EntityRef>,
}

impl TestOrder {
    pub fn test(&self, test_item_id: &str) -> Option<&OrderTest> {
        self.tests.iter().find(|t| t.id == test_item_id)
    }

    pub fn total_price(&self) -> Decimal {
        self.tests.iter().map(|t| t.price).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    #[serde(alias = "name")]
    pub test_name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    #[default]
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "paid")]
    Paid,
    #[serde(alias = "cancelled")]
    Cancelled,
    #[serde(alias = "refunded")]
    Refunded,
    #[serde(other)]
    Unknown,
}

/// Bill created with a test order; the revenue screens list the same records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub bill_number: String,
    #[serde(alias = "patient")]
    pub patient_id: EntityRef,
    #[serde(default, alias = "doctor")]
    pub doctor_id: Option<EntityRef>,
    #[serde(default)]
    pub items: Vec<BillItem>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: BillStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub commission_amount: Decimal,
    #[serde(default)]
    pub net_revenue: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub type RevenueRecord = Bill;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    LabMaterials,
    Salary,
    Commission,
    Utility,
    Rent,
    Miscellaneous,
}

impl ExpenseCategory {
    pub const ALL: [Self; 6] = [
        Self::LabMaterials,
        Self::Salary,
        Self::Commission,
        Self::Utility,
        Self::Rent,
        Self::Miscellaneous,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    #[serde(deserialize_with = "flexible_date::required")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default, alias = "doctorId")]
    pub doctor: Option<EntityRef>,
}

/// Singleton lab settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabConfig {
    pub lab_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub timings: String,
}

pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Wire::deserialize(deserializer)? {
        Wire::Text(s) => s,
        Wire::Number(n) => n.to_string(),
    })
}

/// Dates arrive either as `YYYY-MM-DD` or as full ISO timestamps.
pub(crate) mod flexible_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
        let trimmed = raw.trim();
        let head = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(head, "%Y-%m-%d")
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

//! Consumption budgets at resource group, subscription and management group scope
//!
//! The three resource types share one model; they differ in the attribute that
//! carries the scope, the time grains the API accepts and the kinds of
//! notification contacts allowed.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::Value;
use stratus_core::resource_id::{
    IdParseError, ManagementGroupId, ResourceGroupId, ResourceIdentifier, ScopeId, SubscriptionId,
};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::API_VERSION;
use super::ids::BudgetId;
use crate::registration::{
    Attributes, AzureResource, ProviderContext, decode, encode, from_body, parse_id, to_body,
};

string_enum!(
    /// Period a budget amount applies to
    TimeGrainType {
        Annually => "Annually",
        BillingAnnual => "BillingAnnual",
        BillingMonth => "BillingMonth",
        BillingQuarter => "BillingQuarter",
        Monthly => "Monthly",
        Quarterly => "Quarterly",
    }
);

string_enum!(
    ThresholdType {
        Actual => "Actual",
        Forecasted => "Forecasted",
    }
);

string_enum!(
    OperatorType {
        EqualTo => "EqualTo",
        GreaterThan => "GreaterThan",
        GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
    }
);

const DIMENSION_NAMES: &[&str] = &[
    "ChargeType",
    "Frequency",
    "InvoiceId",
    "Meter",
    "MeterCategory",
    "MeterSubCategory",
    "PartNumber",
    "PricingModel",
    "Product",
    "ProductOrderId",
    "ProductOrderName",
    "PublisherType",
    "ReservationId",
    "ReservationName",
    "ResourceGroupName",
    "ResourceGuid",
    "ResourceId",
    "ResourceLocation",
    "ResourceType",
    "ServiceFamily",
    "ServiceName",
    "UnitOfMeasure",
];

/// Budgets cannot start before the Consumption API existed
const EARLIEST_START: (i32, u32, u32) = (2017, 6, 1);

// =============================================================================
// Configuration model
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_time_grain() -> String {
    TimeGrainType::Monthly.to_string()
}

fn default_threshold_type() -> String {
    ThresholdType::Actual.to_string()
}

fn default_filter_operator() -> String {
    "In".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetModel {
    pub name: String,
    pub amount: f64,
    #[serde(default = "default_time_grain")]
    pub time_grain: String,
    pub time_period: TimePeriod,
    #[serde(default)]
    pub notification: Vec<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub threshold: i64,
    #[serde(default = "default_threshold_type")]
    pub threshold_type: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension: Vec<FilterItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<FilterItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterItem {
    pub name: String,
    #[serde(default = "default_filter_operator")]
    pub operator: String,
    pub values: Vec<String>,
}

// =============================================================================
// API payload
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    #[serde(rename = "eTag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: BudgetProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProperties {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_grain: Option<TimeGrainType>,
    #[serde(default)]
    pub time_period: BudgetTimePeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BudgetFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<BTreeMap<String, BudgetNotification>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTimePeriod {
    #[serde(default)]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Either a single expression or an `and` of several
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<BudgetFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ComparisonExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<ComparisonExpression>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExpression {
    pub name: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetNotification {
    pub enabled: bool,
    pub operator: OperatorType,
    pub threshold: f64,
    #[serde(default)]
    pub contact_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_type: Option<ThresholdType>,
}

// =============================================================================
// Expand / flatten
// =============================================================================

/// Key of a notification in the `notifications` map
pub fn notification_key(threshold_type: &str, operator: &str, threshold: f64) -> String {
    format!("{}_{}_{:.6}_Percent", threshold_type, operator, threshold)
}

pub fn expand(model: &BudgetModel) -> Budget {
    Budget {
        etag: model.etag.clone(),
        properties: BudgetProperties {
            category: "Cost".to_string(),
            amount: model.amount,
            time_grain: Some(TimeGrainType::parse(&model.time_grain)),
            time_period: BudgetTimePeriod {
                start_date: model.time_period.start_date.clone(),
                end_date: model.time_period.end_date.clone(),
            },
            filter: model.filter.as_ref().and_then(expand_filter),
            notifications: Some(expand_notifications(&model.notification)),
        },
    }
}

fn expand_notifications(notifications: &[Notification]) -> BTreeMap<String, BudgetNotification> {
    notifications
        .iter()
        .map(|n| {
            let key = notification_key(&n.threshold_type, &n.operator, n.threshold as f64);
            let notification = BudgetNotification {
                enabled: n.enabled,
                operator: OperatorType::parse(&n.operator),
                threshold: n.threshold as f64,
                contact_emails: n.contact_emails.clone(),
                contact_groups: Some(n.contact_groups.clone()),
                contact_roles: Some(n.contact_roles.clone()),
                threshold_type: Some(ThresholdType::parse(&n.threshold_type)),
            };
            (key, notification)
        })
        .collect()
}

fn expand_filter(filter: &Filter) -> Option<BudgetFilter> {
    let expression = |item: &FilterItem| ComparisonExpression {
        name: item.name.clone(),
        operator: item.operator.clone(),
        values: item.values.clone(),
    };

    let mut expressions: Vec<BudgetFilter> = filter
        .dimension
        .iter()
        .map(|d| BudgetFilter {
            dimensions: Some(expression(d)),
            ..Default::default()
        })
        .collect();
    expressions.extend(filter.tag.iter().map(|t| BudgetFilter {
        tags: Some(expression(t)),
        ..Default::default()
    }));

    match expressions.len() {
        0 => None,
        1 => expressions.pop(),
        _ => Some(BudgetFilter {
            and: Some(expressions),
            ..Default::default()
        }),
    }
}

pub fn flatten(id: &BudgetId, budget: Budget) -> BudgetModel {
    let properties = budget.properties;
    BudgetModel {
        name: id.budget_name.clone(),
        amount: properties.amount,
        time_grain: properties
            .time_grain
            .map(|g| g.to_string())
            .unwrap_or_else(default_time_grain),
        time_period: TimePeriod {
            start_date: properties.time_period.start_date,
            end_date: properties.time_period.end_date,
        },
        notification: properties
            .notifications
            .unwrap_or_default()
            .into_values()
            .map(flatten_notification)
            .collect(),
        filter: properties.filter.map(flatten_filter).filter(|f| {
            !f.dimension.is_empty() || !f.tag.is_empty()
        }),
        etag: budget.etag,
    }
}

fn flatten_notification(n: BudgetNotification) -> Notification {
    Notification {
        enabled: n.enabled,
        threshold: n.threshold.round() as i64,
        threshold_type: n
            .threshold_type
            .map(|t| t.to_string())
            .unwrap_or_else(default_threshold_type),
        operator: n.operator.to_string(),
        contact_emails: n.contact_emails,
        contact_groups: n.contact_groups.unwrap_or_default(),
        contact_roles: n.contact_roles.unwrap_or_default(),
    }
}

fn flatten_filter(filter: BudgetFilter) -> Filter {
    let item = |e: ComparisonExpression| FilterItem {
        name: e.name,
        operator: e.operator,
        values: e.values,
    };

    let mut out = Filter::default();
    let expressions = match filter.and {
        Some(and) => and,
        None => vec![filter],
    };
    for expression in expressions {
        if let Some(d) = expression.dimensions {
            out.dimension.push(item(d));
        }
        if let Some(t) = expression.tags {
            out.tag.push(item(t));
        }
    }
    out
}

// =============================================================================
// Validation
// =============================================================================

fn validate_start_date(value: &Value) -> Result<(), String> {
    types::validate_rfc3339(value)?;
    let Value::String(s) = value else {
        return Err("expected a string".to_string());
    };
    let date = DateTime::parse_from_rfc3339(s)
        .map_err(|e| e.to_string())?
        .date_naive();
    if date.day() != 1 {
        return Err(format!(
            "{s:?} must be the first day of a month"
        ));
    }
    let (y, m, d) = EARLIEST_START;
    if NaiveDate::from_ymd_opt(y, m, d).is_some_and(|earliest| date < earliest) {
        return Err(format!("{s:?} must be on or after June 1, 2017"));
    }
    Ok(())
}

fn start_date_changed(old: &Value, new: &Value) -> bool {
    let start = |v: &Value| match v {
        Value::Map(m) => m.get("start_date").cloned(),
        _ => None,
    };
    start(old) != start(new)
}

/// Which scope a budget resource type manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    ResourceGroup,
    Subscription,
    ManagementGroup,
}

impl BudgetScope {
    /// Configuration attribute holding the scope's ID
    pub fn attribute(self) -> &'static str {
        match self {
            BudgetScope::ResourceGroup => "resource_group_id",
            BudgetScope::Subscription => "subscription_id",
            BudgetScope::ManagementGroup => "management_group_id",
        }
    }

    fn scope_type(self) -> AttributeType {
        match self {
            BudgetScope::ResourceGroup => types::resource_id::<ResourceGroupId>(),
            BudgetScope::Subscription => types::resource_id::<SubscriptionId>(),
            BudgetScope::ManagementGroup => types::resource_id::<ManagementGroupId>(),
        }
    }

    fn matches(self, scope: &ScopeId) -> bool {
        matches!(
            (self, scope),
            (BudgetScope::ResourceGroup, ScopeId::ResourceGroup(_))
                | (BudgetScope::Subscription, ScopeId::Subscription(_))
                | (BudgetScope::ManagementGroup, ScopeId::ManagementGroup(_))
        )
    }

    /// Billing-period grains are only available above resource group level
    fn time_grains(self) -> Vec<&'static str> {
        match self {
            BudgetScope::ResourceGroup => vec!["Annually", "Monthly", "Quarterly"],
            _ => TimeGrainType::possible_values().to_vec(),
        }
    }

    /// Management group budgets only notify email addresses
    fn supports_groups_and_roles(self) -> bool {
        self != BudgetScope::ManagementGroup
    }
}

fn filter_item_schema(names: Option<&[&str]>) -> AttributeType {
    let name = match names {
        Some(names) => types::string_in_slice(names, false),
        None => types::non_empty_string(),
    };
    AttributeType::set(AttributeType::block(vec![
        AttributeSchema::new("name", name).required(),
        AttributeSchema::new("operator", types::string_in_slice(&["In"], false))
            .with_default(Value::String(default_filter_operator())),
        AttributeSchema::new("values", AttributeType::list(AttributeType::String))
            .required()
            .with_items(1, usize::MAX),
    ]))
}

// =============================================================================
// Resource
// =============================================================================

pub struct BudgetResource {
    pub scope: BudgetScope,
}

impl BudgetResource {
    pub fn new(scope: BudgetScope) -> Self {
        Self { scope }
    }

    fn budget_id(&self, id: &str) -> Result<BudgetId, IdParseError> {
        let budget_id = BudgetId::parse(id)?;
        match budget_id.scope_id() {
            Ok(scope) if self.scope.matches(&scope) => Ok(budget_id),
            Ok(scope) => Err(IdParseError::Invalid {
                id_type: BudgetId::TYPE_NAME.to_string(),
                input: id.to_string(),
                message: format!(
                    "expected a budget scoped to a {} but got a {} scope",
                    self.scope.attribute().trim_end_matches("_id").replace('_', " "),
                    scope.kind()
                ),
            }),
            Err(e) => Err(e),
        }
    }

    fn put_body(&self, config: &Attributes, etag: Option<String>) -> ProviderResult<serde_json::Value> {
        let mut model: BudgetModel = decode(config)?;
        if etag.is_some() {
            model.etag = etag;
        }
        to_body(&expand(&model))
    }
}

#[async_trait]
impl AzureResource for BudgetResource {
    fn type_name(&self) -> &'static str {
        match self.scope {
            BudgetScope::ResourceGroup => "azurerm_consumption_budget_resource_group",
            BudgetScope::Subscription => "azurerm_consumption_budget_subscription",
            BudgetScope::ManagementGroup => "azurerm_consumption_budget_management_group",
        }
    }

    fn schema(&self) -> ResourceSchema {
        let mut notification = vec![
            AttributeSchema::new("enabled", AttributeType::Bool).with_default(Value::Bool(true)),
            AttributeSchema::new("threshold", types::int_between(0, 1000)).required(),
            AttributeSchema::new(
                "threshold_type",
                types::string_in_slice(ThresholdType::possible_values(), false),
            )
            .with_default(Value::String(default_threshold_type())),
            AttributeSchema::new(
                "operator",
                types::string_in_slice(OperatorType::possible_values(), false),
            )
            .required(),
            AttributeSchema::new(
                "contact_emails",
                AttributeType::list(types::non_empty_string()),
            ),
        ];
        if self.scope.supports_groups_and_roles() {
            notification.push(AttributeSchema::new(
                "contact_groups",
                AttributeType::list(types::non_empty_string()),
            ));
            notification.push(AttributeSchema::new(
                "contact_roles",
                AttributeType::list(types::non_empty_string()),
            ));
        }

        ResourceSchema::new(self.type_name())
            .with_description("A consumption budget with threshold notifications")
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new(self.scope.attribute(), self.scope.scope_type())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("amount", types::float_greater_than(0.0)).required())
            .attribute(
                AttributeSchema::new(
                    "time_grain",
                    types::string_in_slice(&self.scope.time_grains(), false),
                )
                .with_default(Value::String(default_time_grain()))
                .force_new(),
            )
            .attribute(
                AttributeSchema::new(
                    "time_period",
                    AttributeType::block(vec![
                        AttributeSchema::new(
                            "start_date",
                            types::custom("BudgetStartDate", AttributeType::String, validate_start_date),
                        )
                        .required(),
                        AttributeSchema::new("end_date", types::rfc3339()).optional_computed(),
                    ]),
                )
                .required()
                .with_force_new_if(start_date_changed),
            )
            .attribute(
                AttributeSchema::new("notification", AttributeType::set(AttributeType::block(notification)))
                    .required()
                    .with_items(1, 5),
            )
            .attribute(AttributeSchema::new(
                "filter",
                AttributeType::block(vec![
                    AttributeSchema::new("dimension", filter_item_schema(Some(DIMENSION_NAMES))),
                    AttributeSchema::new("tag", filter_item_schema(None)),
                ]),
            ))
            .attribute(AttributeSchema::new("etag", AttributeType::String).optional_computed())
    }

    fn id_format(&self) -> String {
        BudgetId::expected_format()
    }

    fn validate_id(&self, id: &str) -> Result<(), IdParseError> {
        self.budget_id(id).map(|_| ())
    }

    fn validate_config(&self, config: &Attributes) -> Result<(), String> {
        let model: BudgetModel = decode(config).map_err(|e| e.to_string())?;
        for n in &model.notification {
            if n.contact_emails.is_empty() && n.contact_groups.is_empty() && n.contact_roles.is_empty() {
                return Err(format!(
                    "notification {}: at least one of contact_emails, contact_groups or contact_roles must be set",
                    notification_key(&n.threshold_type, &n.operator, n.threshold as f64)
                ));
            }
            if n.threshold_type == ThresholdType::Forecasted.as_str()
                && n.operator == OperatorType::EqualTo.as_str()
            {
                return Err("forecasted notifications do not support the EqualTo operator".to_string());
            }
        }
        Ok(())
    }

    fn id_from_config(&self, _ctx: &ProviderContext, config: &Attributes) -> ProviderResult<String> {
        let scope = config
            .get(self.scope.attribute())
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::validation(format!("{} must be set", self.scope.attribute())))?;
        let model: BudgetModel = decode(config)?;
        Ok(BudgetId::new(scope, model.name).id())
    }

    async fn create(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
    ) -> ProviderResult<()> {
        let budget_id = self.budget_id(id).map_err(ProviderError::invalid_id)?;
        let body = self.put_body(config, None)?;
        ctx.client
            .put(id, API_VERSION, &body)
            .await
            .map_err(|e| e.wrap(format!("creating {}", budget_id)))?;
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>> {
        let budget_id: BudgetId = parse_id(id)?;
        let Some(body) = ctx
            .client
            .get(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", budget_id)))?
        else {
            return Ok(None);
        };

        let budget: Budget = from_body(body)?;
        let mut attributes = encode(&flatten(&budget_id, budget))?;
        attributes.insert(
            self.scope.attribute().to_string(),
            Value::String(budget_id.scope.clone()),
        );
        Ok(Some(attributes))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        id: &str,
        previous: &Attributes,
        config: &Attributes,
    ) -> ProviderResult<()> {
        let budget_id = self.budget_id(id).map_err(ProviderError::invalid_id)?;
        // the API rejects an update without the current eTag
        let etag = previous
            .get("etag")
            .and_then(Value::as_str)
            .map(str::to_string);
        let body = self.put_body(config, etag)?;
        ctx.client
            .put(id, API_VERSION, &body)
            .await
            .map_err(|e| e.wrap(format!("updating {}", budget_id)))?;
        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<()> {
        let budget_id: BudgetId = parse_id(id)?;
        ctx.client
            .delete(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("deleting {}", budget_id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> BudgetModel {
        BudgetModel {
            name: "budget1".into(),
            amount: 1000.0,
            time_grain: "Monthly".into(),
            time_period: TimePeriod {
                start_date: "2024-01-01T00:00:00Z".into(),
                end_date: None,
            },
            notification: vec![Notification {
                enabled: true,
                threshold: 80,
                threshold_type: "Actual".into(),
                operator: "GreaterThan".into(),
                contact_emails: vec!["ops@example.com".into()],
                ..Default::default()
            }],
            filter: None,
            etag: None,
        }
    }

    #[test]
    fn notification_keys() {
        assert_eq!(
            notification_key("Actual", "GreaterThan", 80.0),
            "Actual_GreaterThan_80.000000_Percent"
        );
        assert_eq!(
            notification_key("Forecasted", "EqualTo", 12.5),
            "Forecasted_EqualTo_12.500000_Percent"
        );
    }

    #[test]
    fn expand_builds_request() {
        let body = serde_json::to_value(expand(&model())).unwrap();
        assert_eq!(body["properties"]["category"], "Cost");
        assert_eq!(body["properties"]["timeGrain"], "Monthly");
        assert_eq!(
            body["properties"]["timePeriod"],
            json!({"startDate": "2024-01-01T00:00:00Z"})
        );
        let notification = &body["properties"]["notifications"]["Actual_GreaterThan_80.000000_Percent"];
        assert_eq!(notification["threshold"], 80.0);
        assert_eq!(notification["contactEmails"], json!(["ops@example.com"]));
        assert!(body.get("eTag").is_none());
        assert!(body["properties"].get("filter").is_none());
    }

    #[test]
    fn single_filter_is_not_wrapped() {
        let filter = Filter {
            dimension: vec![FilterItem {
                name: "ResourceGroupName".into(),
                operator: "In".into(),
                values: vec!["rg".into()],
            }],
            tag: vec![],
        };
        let expanded = expand_filter(&filter).unwrap();
        assert!(expanded.and.is_none());
        assert_eq!(expanded.dimensions.unwrap().name, "ResourceGroupName");
    }

    #[test]
    fn multiple_filters_are_combined_with_and() {
        let filter = Filter {
            dimension: vec![FilterItem {
                name: "ResourceGroupName".into(),
                operator: "In".into(),
                values: vec!["rg".into()],
            }],
            tag: vec![FilterItem {
                name: "env".into(),
                operator: "In".into(),
                values: vec!["prod".into(), "test".into()],
            }],
        };
        let expanded = expand_filter(&filter).unwrap();
        assert_eq!(expanded.and.as_ref().map(Vec::len), Some(2));
        assert_eq!(flatten_filter(expanded), filter);
    }

    #[test]
    fn flatten_reads_response() {
        let budget: Budget = serde_json::from_value(json!({
            "eTag": "\"1d34d016a593709\"",
            "properties": {
                "category": "Cost",
                "amount": 100.65,
                "timeGrain": "monthly",
                "timePeriod": {"startDate": "2024-01-01T00:00:00Z", "endDate": "2034-01-01T00:00:00Z"},
                "notifications": {
                    "Actual_GreaterThan_80.000000_Percent": {
                        "enabled": true,
                        "operator": "GreaterThan",
                        "threshold": 80.0,
                        "contactEmails": ["ops@example.com"],
                        "contactRoles": [],
                        "thresholdType": "Actual"
                    }
                },
                "filter": {"tags": {"name": "env", "operator": "In", "values": ["prod"]}}
            }
        }))
        .unwrap();

        let id = BudgetId::new("/subscriptions/sub", "budget1");
        let model = flatten(&id, budget);
        assert_eq!(model.name, "budget1");
        assert_eq!(model.time_grain, "Monthly");
        assert_eq!(model.time_period.end_date.as_deref(), Some("2034-01-01T00:00:00Z"));
        assert_eq!(model.notification.len(), 1);
        assert_eq!(model.notification[0].threshold, 80);
        assert!(model.notification[0].contact_roles.is_empty());
        assert_eq!(model.filter.unwrap().tag[0].values, vec!["prod".to_string()]);
        assert_eq!(model.etag.as_deref(), Some("\"1d34d016a593709\""));
    }

    #[test]
    fn start_date_rules() {
        assert!(validate_start_date(&Value::String("2024-03-01T00:00:00Z".into())).is_ok());
        assert!(validate_start_date(&Value::String("2024-03-02T00:00:00Z".into())).is_err());
        assert!(validate_start_date(&Value::String("2017-05-01T00:00:00Z".into())).is_err());
        assert!(validate_start_date(&Value::String("March".into())).is_err());
    }

    #[test]
    fn resource_group_budgets_reject_billing_grains() {
        let resource = BudgetResource::new(BudgetScope::ResourceGroup);
        let mut config = encode(&model()).unwrap();
        config.insert(
            "resource_group_id".into(),
            Value::String("/subscriptions/sub/resourceGroups/rg".into()),
        );
        assert!(resource.schema().validate(&config).is_ok());

        config.insert("time_grain".into(), Value::String("BillingMonth".into()));
        assert!(resource.schema().validate(&config).is_err());

        let subscription = BudgetResource::new(BudgetScope::Subscription);
        config.remove("resource_group_id");
        config.insert("subscription_id".into(), Value::String("/subscriptions/sub".into()));
        assert!(subscription.schema().validate(&config).is_ok());
    }

    #[test]
    fn management_group_budgets_only_notify_emails() {
        let resource = BudgetResource::new(BudgetScope::ManagementGroup);
        let mut m = model();
        m.notification[0].contact_roles = vec!["Owner".into()];
        let mut config = encode(&m).unwrap();
        config.insert(
            "management_group_id".into(),
            Value::String("/providers/Microsoft.Management/managementGroups/mg".into()),
        );
        let errors = resource.schema().validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("contact_roles")));
    }

    #[test]
    fn notifications_need_a_contact() {
        let resource = BudgetResource::new(BudgetScope::Subscription);
        let mut m = model();
        m.notification[0].contact_emails.clear();
        let config = encode(&m).unwrap();
        assert!(resource.validate_config(&config).is_err());
        assert!(resource.validate_config(&encode(&model()).unwrap()).is_ok());
    }

    #[test]
    fn ids_must_match_the_resource_scope() {
        let resource = BudgetResource::new(BudgetScope::ResourceGroup);
        assert!(
            resource
                .validate_id("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Consumption/budgets/b")
                .is_ok()
        );
        let err = resource
            .validate_id("/subscriptions/sub/providers/Microsoft.Consumption/budgets/b")
            .unwrap_err();
        assert!(err.to_string().contains("subscription scope"));
    }

    #[test]
    fn changing_start_date_forces_replacement() {
        let schema = BudgetResource::new(BudgetScope::Subscription).schema();
        let attr = &schema.attributes["time_period"];
        let period = |start: &str| {
            Value::Map(
                [("start_date".to_string(), Value::String(start.into()))]
                    .into_iter()
                    .collect(),
            )
        };
        assert!(attr.requires_replacement(
            Some(&period("2024-01-01T00:00:00Z")),
            &period("2024-02-01T00:00:00Z")
        ));
        assert!(!attr.requires_replacement(
            Some(&period("2024-01-01T00:00:00Z")),
            &period("2024-01-01T00:00:00Z")
        ));
    }
}

use super::fields::FieldType;
use super::model::{FieldDefinition, FieldPriority, SectionDefinition};
use super::registry::SchemaRegistry;

use FieldPriority::{High, Low, Medium};

pub fn default_sections() -> Vec<SectionDefinition> {
    vec![
        SectionDefinition::new(
            "personal",
            "Personal details",
            vec![
                field("full_name", "full name", High, FieldType::Text),
                field("date_of_birth", "date of birth", Medium, FieldType::Date),
                field(
                    "marital_status",
                    "marital status",
                    Medium,
                    FieldType::enumeration(&["single", "married", "partnered", "divorced", "widowed"]),
                ),
                field("dependents", "number of dependents", Low, FieldType::Number),
                field("occupation", "occupation", Medium, FieldType::Text),
                field("employer", "employer", Low, FieldType::Text),
            ],
        ),
        SectionDefinition::new(
            "contact",
            "Contact preferences",
            vec![
                field("email", "email address", High, FieldType::Text),
                field("phone", "phone number", High, FieldType::Text),
                field(
                    "preferred_channel",
                    "preferred contact channel",
                    Medium,
                    FieldType::enumeration(&["email", "phone", "sms", "in_person"]),
                ),
                field("best_time_to_contact", "best time to contact", Low, FieldType::Text),
            ],
        ),
        SectionDefinition::new(
            "financial",
            "Financial position",
            vec![
                field("annual_income", "annual income", High, FieldType::Number),
                field("net_worth", "net worth", High, FieldType::Number),
                field(
                    "risk_tolerance",
                    "risk tolerance",
                    High,
                    FieldType::enumeration(&["conservative", "moderate", "aggressive"]),
                )
                .with_description("How much short-term loss the customer can stomach."),
                field(
                    "investment_horizon",
                    "investment horizon",
                    Medium,
                    FieldType::enumeration(&["short", "medium", "long"]),
                ),
                field("tax_bracket", "tax bracket", Low, FieldType::Text),
            ],
        ),
        SectionDefinition::new(
            "goals",
            "Goals and planning",
            vec![
                field("primary_goal", "primary financial goal", High, FieldType::Text)
                    .with_description("e.g. retire early, fund children's education."),
                field("retirement_age", "target retirement age", Medium, FieldType::Number),
                field("has_estate_plan", "estate plan status", Low, FieldType::Boolean),
                field("planned_purchases", "planned large purchases", Low, FieldType::Json),
            ],
        ),
        SectionDefinition::new(
            "preferences",
            "Investment preferences",
            vec![
                field(
                    "product_interests",
                    "product interests",
                    Low,
                    FieldType::multi_select(&[
                        "equities",
                        "bonds",
                        "real_estate",
                        "private_equity",
                        "insurance",
                        "crypto",
                    ]),
                ),
                field("esg_preference", "ESG preference", Low, FieldType::Boolean),
                field(
                    "review_frequency",
                    "portfolio review frequency",
                    Low,
                    FieldType::enumeration(&["monthly", "quarterly", "yearly"]),
                ),
            ],
        ),
    ]
}

pub fn default_registry() -> SchemaRegistry {
    SchemaRegistry::new(default_sections())
}

fn field(key: &str, label: &str, priority: FieldPriority, field_type: FieldType) -> FieldDefinition {
    FieldDefinition::new(key, label, priority, field_type)
}

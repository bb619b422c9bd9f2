use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sales pipeline phase a task sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Prospecting,
    Proposal,
    Execution,
    PostSale,
}

impl Phase {
    /// Fixed reporting order.
    pub const ALL: [Phase; 4] = [
        Phase::Prospecting,
        Phase::Proposal,
        Phase::Execution,
        Phase::PostSale,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Phase::Prospecting => "prospecting",
            Phase::Proposal => "proposal",
            Phase::Execution => "execution",
            Phase::PostSale => "post-sale",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Prospecting => "Prospecting & Lead Generation",
            Phase::Proposal => "Proposal & Negotiation",
            Phase::Execution => "Execution & Delivery",
            Phase::PostSale => "Post-Sale & Relationship",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prospecting" => Ok(Phase::Prospecting),
            "proposal" => Ok(Phase::Proposal),
            "execution" => Ok(Phase::Execution),
            "post-sale" => Ok(Phase::PostSale),
            _ => Err(crate::Error::UnknownPhase(s.to_string())),
        }
    }
}

/// Business area a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessArea {
    Solvent,
    Solar,
    ElectricalProducts,
    ElectricalServices,
    FreeEnergyMarket,
}

impl BusinessArea {
    /// Fixed reporting order.
    pub const ALL: [BusinessArea; 5] = [
        BusinessArea::Solvent,
        BusinessArea::Solar,
        BusinessArea::ElectricalProducts,
        BusinessArea::ElectricalServices,
        BusinessArea::FreeEnergyMarket,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            BusinessArea::Solvent => "solvent",
            BusinessArea::Solar => "solar",
            BusinessArea::ElectricalProducts => "electrical-products",
            BusinessArea::ElectricalServices => "electrical-services",
            BusinessArea::FreeEnergyMarket => "free-energy-market",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BusinessArea::Solvent => "Dielectric Solvent",
            BusinessArea::Solar => "Solar Energy",
            BusinessArea::ElectricalProducts => "Electrical Products",
            BusinessArea::ElectricalServices => "Electrical Services",
            BusinessArea::FreeEnergyMarket => "Free Energy Market",
        }
    }
}

impl std::fmt::Display for BusinessArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl std::str::FromStr for BusinessArea {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solvent" => Ok(BusinessArea::Solvent),
            "solar" => Ok(BusinessArea::Solar),
            "electrical-products" => Ok(BusinessArea::ElectricalProducts),
            "electrical-services" => Ok(BusinessArea::ElectricalServices),
            "free-energy-market" => Ok(BusinessArea::FreeEnergyMarket),
            _ => Err(crate::Error::UnknownBusinessArea(s.to_string())),
        }
    }
}

/// A single tracked task. Owned by the task source; the export layer
/// only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub business_area: BusinessArea,
    pub phase: Phase,
    pub responsible: Option<String>,
    pub deadline: Option<String>,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub markup_margin: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating a task. Prices default to zero when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub business_area: BusinessArea,
    pub phase: Phase,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub sale_price: f64,
    #[serde(default)]
    pub markup_margin: f64,
}

/// Partial update for a task; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub client: Option<String>,
    pub description: Option<String>,
    pub business_area: Option<BusinessArea>,
    pub phase: Option<Phase>,
    pub responsible: Option<String>,
    pub deadline: Option<String>,
    pub purchase_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub markup_margin: Option<f64>,
}

/// Aggregate purchase/sale sums across the full task set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTotals {
    pub purchase: f64,
    pub sale: f64,
}

impl PriceTotals {
    pub fn gross_profit(&self) -> f64 {
        self.sale - self.purchase
    }

    /// Profit as a percentage of the purchase total, 0 when nothing was
    /// purchased.
    pub fn average_margin(&self) -> f64 {
        if self.purchase > 0.0 {
            self.gross_profit() / self.purchase * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_phase_slug_roundtrip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_str(phase.slug()).unwrap(), phase);
        }
    }

    #[test]
    fn test_business_area_slug_roundtrip() {
        for area in BusinessArea::ALL {
            assert_eq!(BusinessArea::from_str(area.slug()).unwrap(), area);
        }
    }

    #[test]
    fn test_unknown_phase_rejected() {
        assert!(Phase::from_str("shipping").is_err());
    }

    #[test]
    fn test_new_task_price_defaults() {
        let task: NewTask = serde_json::from_str(
            r#"{"title": "Panel install", "businessArea": "solar", "phase": "proposal"}"#,
        )
        .unwrap();

        assert_eq!(task.purchase_price, 0.0);
        assert_eq!(task.sale_price, 0.0);
        assert_eq!(task.markup_margin, 0.0);
        assert!(task.client.is_none());
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task {
            id: 1,
            title: "T".to_string(),
            client: None,
            description: None,
            business_area: BusinessArea::Solar,
            phase: Phase::Execution,
            responsible: None,
            deadline: None,
            purchase_price: 10.0,
            sale_price: 15.0,
            markup_margin: 50.0,
            created_at: None,
            updated_at: None,
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["businessArea"], "solar");
        assert_eq!(value["purchasePrice"], 10.0);
        assert!(value["createdAt"].is_null());
    }

    #[test]
    fn test_price_totals_margin() {
        let totals = PriceTotals {
            purchase: 100.0,
            sale: 150.0,
        };
        assert_eq!(totals.gross_profit(), 50.0);
        assert_eq!(totals.average_margin(), 50.0);

        let empty = PriceTotals::default();
        assert_eq!(empty.average_margin(), 0.0);
    }
}

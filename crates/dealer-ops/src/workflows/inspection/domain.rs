use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Entity, RecordId};

/// Coarse lifecycle status of a vehicle in the dealership inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    #[serde(alias = "A PERITAR")]
    APeritar,
    #[serde(alias = "A INGRESAR")]
    AIngresar,
    #[serde(alias = "EN REPARACION")]
    EnReparacion,
    Disponible,
    Pausado,
    Reservado,
    Vendido,
    Entregado,
    Descartado,
}

impl VehicleStatus {
    pub const fn code(self) -> &'static str {
        match self {
            Self::APeritar => "A_PERITAR",
            Self::AIngresar => "A_INGRESAR",
            Self::EnReparacion => "EN_REPARACION",
            Self::Disponible => "DISPONIBLE",
            Self::Pausado => "PAUSADO",
            Self::Reservado => "RESERVADO",
            Self::Vendido => "VENDIDO",
            Self::Entregado => "ENTREGADO",
            Self::Descartado => "DESCARTADO",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::APeritar => "A peritar",
            Self::AIngresar => "A ingresar",
            Self::EnReparacion => "En reparación",
            Self::Disponible => "Disponible",
            Self::Pausado => "Pausado",
            Self::Reservado => "Reservado",
            Self::Vendido => "Vendido",
            Self::Entregado => "Entregado",
            Self::Descartado => "Descartado",
        }
    }
}

/// Sub-state layered on `A_PERITAR` once an approved inspection has been deferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionState {
    #[default]
    None,
    AwaitingDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub id: RecordId,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub kilometers: Option<u32>,
    pub status: VehicleStatus,
    #[serde(default)]
    pub assigned_mechanic: Option<String>,
    #[serde(default)]
    pub inspection_requested_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inspection_requested_by: Option<String>,
    #[serde(default)]
    pub disposition: DispositionState,
    #[serde(default)]
    pub discard_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discard_reason: Option<String>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn new(brand: impl Into<String>, model: impl Into<String>, status: VehicleStatus) -> Self {
        Self {
            id: RecordId::default(),
            brand: brand.into(),
            model: model.into(),
            year: None,
            plate: None,
            kilometers: None,
            status,
            assigned_mechanic: None,
            inspection_requested_date: None,
            inspection_requested_by: None,
            disposition: DispositionState::None,
            discard_date: None,
            discard_reason: None,
            created_date: None,
            updated_date: None,
        }
    }

    pub fn inspection_decision_pending(&self) -> bool {
        self.disposition == DispositionState::AwaitingDecision
    }

    /// A request stamped after `inspection` was created starts a new inspection cycle, so that
    /// inspection no longer speaks for the vehicle.
    pub fn requested_since(&self, inspection: &Inspection) -> bool {
        match (self.inspection_requested_date, inspection.created_date) {
            (Some(requested), Some(created)) => requested > created,
            _ => false,
        }
    }

    /// Whether `mechanic` is the stored assignment, ignoring surrounding whitespace and ASCII case.
    pub fn assigned_to(&self, mechanic: &str) -> bool {
        let mechanic = mechanic.trim();
        !mechanic.is_empty()
            && self
                .assigned_mechanic
                .as_deref()
                .is_some_and(|assigned| assigned.trim().eq_ignore_ascii_case(mechanic))
    }

    pub fn display_name(&self) -> String {
        match (&self.plate, self.year) {
            (Some(plate), Some(year)) => format!("{} {} {year} ({plate})", self.brand, self.model),
            (Some(plate), None) => format!("{} {} ({plate})", self.brand, self.model),
            (None, Some(year)) => format!("{} {} {year}", self.brand, self.model),
            (None, None) => format!("{} {}", self.brand, self.model),
        }
    }
}

impl Entity for Vehicle {
    const COLLECTION: &'static str = "vehicles";
    const ID_PREFIX: &'static str = "veh";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Status of a single inspection ("peritaje") record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Draft,
    RevisionRequested,
    EditRequested,
    EditApproved,
    PendingApproval,
    Approved,
}

impl InspectionStatus {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::RevisionRequested => "REVISION_REQUESTED",
            Self::EditRequested => "EDIT_REQUESTED",
            Self::EditApproved => "EDIT_APPROVED",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::RevisionRequested => "Revision requested",
            Self::EditRequested => "Edit requested",
            Self::EditApproved => "Edit approved",
            Self::PendingApproval => "Pending approval",
            Self::Approved => "Approved",
        }
    }
}

/// Advisory outcome recorded by the mechanic; the manager's disposition is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Take,
    TakeWithRepairs,
    DoNotTake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionRating {
    #[serde(alias = "Bueno")]
    Good,
    #[serde(alias = "Regular")]
    Fair,
    #[serde(alias = "Malo")]
    Poor,
    #[serde(alias = "N/A")]
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAssessment {
    pub component: String,
    pub rating: ConditionRating,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireAssessment {
    pub position: String,
    pub condition: ConditionRating,
    #[serde(default)]
    pub tread_depth_mm: Option<f32>,
    #[serde(default)]
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintAssessment {
    pub part: String,
    #[serde(default)]
    pub needs_paint: bool,
    #[serde(default)]
    pub needs_bodywork: bool,
    #[serde(default)]
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub description: String,
    #[serde(default)]
    pub performed_on: Option<NaiveDate>,
    #[serde(default)]
    pub kilometers: Option<u32>,
    #[serde(default)]
    pub estimated_cost: f64,
}

/// Structured findings captured on the inspection form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub components: Vec<ComponentAssessment>,
    #[serde(default)]
    pub tires: Vec<TireAssessment>,
    #[serde(default)]
    pub paint: Vec<PaintAssessment>,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

impl Assessment {
    /// Every itemized cost with a label naming its source line.
    pub fn itemized_costs(&self) -> Vec<(String, f64)> {
        let components = self
            .components
            .iter()
            .map(|item| (format!("component:{}", item.component), item.estimated_cost));
        let tires = self
            .tires
            .iter()
            .map(|item| (format!("tire:{}", item.position), item.estimated_cost));
        let paint = self
            .paint
            .iter()
            .map(|item| (format!("paint:{}", item.part), item.estimated_cost));
        let services = self
            .services
            .iter()
            .map(|item| (format!("service:{}", item.description), item.estimated_cost));

        components.chain(tires).chain(paint).chain(services).collect()
    }

    /// Sum of all itemized costs, independent of the qualitative rating of each line.
    pub fn total_estimated_cost(&self) -> f64 {
        self.itemized_costs().iter().map(|(_, cost)| cost).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    #[serde(default)]
    pub id: RecordId,
    pub vehicle_id: RecordId,
    pub status: InspectionStatus,
    #[serde(default)]
    pub inspector_name: Option<String>,
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub kilometers_at_inspection: Option<u32>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub general_observations: Option<String>,
    #[serde(default)]
    pub assessment: Assessment,
    #[serde(default)]
    pub total_estimated_cost: f64,
    #[serde(default)]
    pub revision_notes: Option<String>,
    #[serde(default)]
    pub revision_requested_by: Option<String>,
    #[serde(default)]
    pub edit_requested_by: Option<String>,
    #[serde(default)]
    pub submitted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Inspection {
    pub fn draft_for(vehicle: &Vehicle) -> Self {
        Self {
            id: RecordId::default(),
            vehicle_id: vehicle.id.clone(),
            status: InspectionStatus::Draft,
            inspector_name: None,
            inspection_date: None,
            kilometers_at_inspection: vehicle.kilometers,
            recommendation: None,
            general_observations: None,
            assessment: Assessment::default(),
            total_estimated_cost: 0.0,
            revision_notes: None,
            revision_requested_by: None,
            edit_requested_by: None,
            submitted_date: None,
            approved_by: None,
            approved_date: None,
            created_date: None,
            updated_date: None,
        }
    }

    /// Copy the editable form fields from a saved draft.
    pub fn apply_draft(&mut self, draft: InspectionDraft) {
        self.inspector_name = draft.inspector_name;
        self.inspection_date = draft.inspection_date;
        self.kilometers_at_inspection = draft.kilometers_at_inspection;
        self.recommendation = draft.recommendation;
        self.general_observations = draft.general_observations;
        self.assessment = draft.assessment;
    }
}

impl Entity for Inspection {
    const COLLECTION: &'static str = "inspections";
    const ID_PREFIX: &'static str = "insp";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Editable fields of the inspection form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionDraft {
    #[serde(default)]
    pub inspector_name: Option<String>,
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub kilometers_at_inspection: Option<u32>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub general_observations: Option<String>,
    #[serde(default)]
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "mecanico")]
    Mechanic,
    #[serde(alias = "gerente")]
    Manager,
    #[serde(alias = "admin")]
    Administrator,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Mechanic => "mechanic",
            Role::Manager => "manager",
            Role::Administrator => "administrator",
        }
    }

    pub const fn is_manager(self) -> bool {
        matches!(self, Role::Manager | Role::Administrator)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mechanic" | "mecanico" | "mecánico" => Some(Role::Mechanic),
            "manager" | "gerente" => Some(Role::Manager),
            "administrator" | "admin" => Some(Role::Administrator),
            _ => None,
        }
    }
}

/// Identity of the user invoking a workflow action, as reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl Actor {
    /// Whether `name` refers to this actor by id, full name, or email.
    pub fn is_named(&self, name: &str) -> bool {
        let name = name.trim();
        !name.is_empty()
            && (name == self.id
                || name.eq_ignore_ascii_case(self.full_name.trim())
                || name.eq_ignore_ascii_case(self.email.trim()))
    }

    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

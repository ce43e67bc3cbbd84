use serde::{Deserialize, Serialize};

/// One vaccination row in Infinite Campus layout
///
/// Field order matches the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub id_1: String,
    pub id_2: String,
    pub vaccine_group_name: String,
    pub vaccination_date: String,
}

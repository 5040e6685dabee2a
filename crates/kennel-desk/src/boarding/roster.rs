//! CSV import for the dog roster and the price list.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{
    ClientId, Dog, DogId, PricingId, PricingUnit, ServicePricing, ServiceType,
};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    DuplicateId { table: &'static str, id: u64 },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::DuplicateId { table, id } => {
                write!(f, "{} CSV lists id {} more than once", table, id)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::DuplicateId { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct DogRow {
    id: u64,
    client_id: u64,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    breed: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    care_instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PricingRow {
    id: u64,
    service_type: ServiceType,
    service_name: String,
    price_per_unit: u32,
    unit: PricingUnit,
    #[serde(default)]
    is_active: Option<bool>,
}

/// Reads `id,client_id,name,breed,care_instructions` rows.
pub struct DogRosterImporter;

impl DogRosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Dog>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Dog>, RosterImportError> {
        let mut seen = BTreeSet::new();
        let mut dogs = Vec::new();

        for record in csv_reader(reader).deserialize::<DogRow>() {
            let row = record?;
            if !seen.insert(row.id) {
                return Err(RosterImportError::DuplicateId {
                    table: "dog",
                    id: row.id,
                });
            }
            dogs.push(Dog {
                id: DogId(row.id),
                client_id: ClientId(row.client_id),
                name: row.name,
                breed: row.breed,
                care_instructions: row.care_instructions,
            });
        }

        Ok(dogs)
    }
}

/// Reads `id,service_type,service_name,price_per_unit,unit,is_active` rows.
/// Prices are major units; a blank `is_active` counts as active.
pub struct PriceListImporter;

impl PriceListImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ServicePricing>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ServicePricing>, RosterImportError> {
        let mut seen = BTreeSet::new();
        let mut rows = Vec::new();

        for record in csv_reader(reader).deserialize::<PricingRow>() {
            let row = record?;
            if !seen.insert(row.id) {
                return Err(RosterImportError::DuplicateId {
                    table: "service pricing",
                    id: row.id,
                });
            }
            rows.push(ServicePricing {
                id: PricingId(row.id),
                service_type: row.service_type,
                service_name: row.service_name,
                price_per_unit: row.price_per_unit,
                unit: row.unit,
                is_active: row.is_active.unwrap_or(true),
            });
        }

        Ok(rows)
    }
}

/// Roster seeded when no CSV is configured.
pub fn sample_roster() -> Vec<Dog> {
    let dog = |id: u64, client: u64, name: &str, breed: &str| Dog {
        id: DogId(id),
        client_id: ClientId(client),
        name: name.to_string(),
        breed: Some(breed.to_string()),
        care_instructions: None,
    };

    vec![
        dog(12, 1, "Biscuit", "Labrador Retriever"),
        dog(50, 1, "Pepper", "Border Collie"),
        dog(51, 1, "Nutmeg", "Cocker Spaniel"),
        dog(99, 2, "Rolo", "Staffordshire Bull Terrier"),
    ]
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.trim().is_empty()))
}

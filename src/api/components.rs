//! Component CRUD handlers: `/{component}/` and `/{component}/{name}`

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::error::ApiError;
use crate::application::state::AppState;
use crate::domain::component::{
    ComponentKind, ComponentRecord, CoolingRecord, PowerRecord, PsuRecord, StorageRecord,
};
use crate::domain::repositories::InsertOutcome;
use crate::domain::wattage::{MAX_WATTAGE, MIN_WATTAGE, in_band};

/// Power text accepted as a string or a bare number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Consumption {
    Text(String),
    Number(serde_json::Number),
}

impl Consumption {
    fn into_text(self) -> String {
        match self {
            Consumption::Text(text) => text.trim().to_string(),
            Consumption::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PowerPayload {
    name: String,
    consumption: Consumption,
}

#[derive(Debug, Deserialize)]
struct PsuPayload {
    name: String,
    wattage: i64,
}

#[derive(Debug, Deserialize)]
struct StoragePayload {
    name: String,
    consumption: Consumption,
    #[serde(rename = "type", default)]
    storage_type: String,
}

#[derive(Debug, Deserialize)]
struct CoolingPayload {
    name: String,
    size: String,
    #[serde(default)]
    has_led: bool,
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::Validation(format!("Invalid payload: {e}")))
}

fn required_name(name: String) -> Result<String, ApiError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    Ok(name)
}

/// Validate a create payload into the record for `kind`
pub fn record_from_payload(kind: ComponentKind, payload: Value) -> Result<ComponentRecord, ApiError> {
    let record = match kind {
        ComponentKind::Cpu | ComponentKind::Gpu | ComponentKind::Ram => {
            let p: PowerPayload = decode(payload)?;
            let power = PowerRecord {
                name: required_name(p.name)?,
                consumption: p.consumption.into_text(),
            };
            ComponentRecord::power(kind, power)
                .ok_or_else(|| ApiError::Validation(format!("{kind} does not take a consumption")))?
        }
        ComponentKind::Psu => {
            let p: PsuPayload = decode(payload)?;
            let wattage = u32::try_from(p.wattage)
                .ok()
                .filter(|w| in_band(*w))
                .ok_or_else(|| {
                    ApiError::Validation(format!(
                        "wattage must be between {MIN_WATTAGE} and {MAX_WATTAGE}, got {}",
                        p.wattage
                    ))
                })?;
            ComponentRecord::Psu(PsuRecord {
                name: required_name(p.name)?,
                wattage,
            })
        }
        ComponentKind::Storage => {
            let p: StoragePayload = decode(payload)?;
            ComponentRecord::Storage(StorageRecord {
                name: required_name(p.name)?,
                consumption: p.consumption.into_text(),
                storage_type: p.storage_type,
            })
        }
        ComponentKind::Cooling => {
            let p: CoolingPayload = decode(payload)?;
            ComponentRecord::Cooling(CoolingRecord {
                name: required_name(p.name)?,
                size: p.size,
                has_led: p.has_led,
            })
        }
    };
    Ok(record)
}

/// `GET /{component}/`
pub async fn list_components(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let kind: ComponentKind = path.parse()?;
    let data = state.repository.list(kind).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

/// `GET /{component}/{name}`: case-insensitive substring match
pub async fn search_components(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (component, name) = path.into_inner();
    let kind: ComponentKind = component.parse()?;

    let data = state.repository.search(kind, &name).await?;
    if data.is_empty() {
        return Err(ApiError::NotFound { kind, name });
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

/// `POST /{component}/`
pub async fn create_component(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let kind: ComponentKind = path.parse()?;
    let record = record_from_payload(kind, payload.into_inner())?;

    match state.repository.create(&record).await? {
        InsertOutcome::Inserted => {
            tracing::info!("Created {} '{}'", kind, record.name());
            Ok(HttpResponse::Created().json(json!({ "success": true, "data": record })))
        }
        InsertOutcome::AlreadyExists => Err(ApiError::Duplicate {
            kind,
            name: record.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_numeric_consumption_is_stored_as_text() {
        let record = record_from_payload(
            ComponentKind::Cpu,
            json!({ "name": " Ryzen 5 5600X ", "consumption": 65 }),
        )
        .unwrap();

        assert_eq!(
            record,
            ComponentRecord::Cpu(PowerRecord {
                name: "Ryzen 5 5600X".into(),
                consumption: "65".into(),
            })
        );
    }

    #[rstest]
    #[case(json!({ "name": "Tiny", "wattage": 150 }))]
    #[case(json!({ "name": "Huge", "wattage": 2500 }))]
    #[case(json!({ "name": "Negative", "wattage": -1 }))]
    #[case(json!({ "name": "", "wattage": 750 }))]
    #[case(json!({ "name": "No wattage" }))]
    fn test_invalid_psu_payloads(#[case] payload: Value) {
        let err = record_from_payload(ComponentKind::Psu, payload).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_storage_and_cooling_payloads() {
        let storage = record_from_payload(
            ComponentKind::Storage,
            json!({ "name": "990 Pro", "consumption": "7 W", "type": "NVMe" }),
        )
        .unwrap();
        assert!(matches!(storage, ComponentRecord::Storage(r) if r.storage_type == "NVMe"));

        let cooling =
            record_from_payload(ComponentKind::Cooling, json!({ "name": "NH-D15", "size": "165 mm" })).unwrap();
        assert!(matches!(cooling, ComponentRecord::Cooling(r) if !r.has_led));
    }
}

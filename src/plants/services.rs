use super::dto::{PlantRequest, PlantView};
use super::repo_types::{Plant, PlantFields};
use crate::images::services::presign_optional;
use crate::state::AppState;

fn blank_to_none(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Checks a create/update body and normalizes its optional text fields.
pub fn validate_plant(req: PlantRequest) -> Result<PlantFields, String> {
    let species = req.species.trim().to_string();
    if species.is_empty() {
        return Err("species is required".into());
    }
    if req.watering_interval_days <= 0 {
        return Err("watering_interval_days must be a positive number of days".into());
    }
    if matches!(req.sun_interval_days, Some(d) if d <= 0) {
        return Err("sun_interval_days must be a positive number of days".into());
    }
    Ok(PlantFields {
        species,
        nickname: blank_to_none(req.nickname),
        location: blank_to_none(req.location),
        temperature: blank_to_none(req.temperature),
        start_date: req.start_date,
        watering_interval_days: req.watering_interval_days,
        sun_interval_days: req.sun_interval_days,
        care_notes: blank_to_none(req.care_notes),
        is_public: req.is_public,
    })
}

pub async fn to_view(st: &AppState, plant: Plant) -> anyhow::Result<PlantView> {
    let image_url = presign_optional(st, plant.image_key.as_deref()).await?;
    Ok(PlantView::from_plant(plant, image_url))
}

pub async fn to_views(st: &AppState, plants: Vec<Plant>) -> anyhow::Result<Vec<PlantView>> {
    let mut out = Vec::with_capacity(plants.len());
    for p in plants {
        out.push(to_view(st, p).await?);
    }
    Ok(out)
}

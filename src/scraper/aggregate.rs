use crate::models::{AssetRecord, RouteResult};

/// Flattens route results into report rows, preserving route then asset order.
pub fn aggregate(results: &[RouteResult]) -> Vec<AssetRecord> {
    results
        .iter()
        .flat_map(|result| {
            result.assets.iter().map(move |asset| AssetRecord {
                route: result.route.name.clone(),
                date: result.date,
                asset_id: asset.asset_id.clone(),
                location: asset.location.clone(),
                asset_type: asset.asset_type.clone(),
                restock_time: asset.restock_time.clone(),
                inventory_taken: asset.inventory_taken.clone(),
            })
        })
        .collect()
}

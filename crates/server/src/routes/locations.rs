use axum::extract::{Path, State};
use service::locations::Address;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[utoipa::path(get, path = "/api/locations/cep/{cep}", tag = "locations", params(("cep" = String, Path, description = "CEP, with or without punctuation")), responses((status = 200, description = "Address"), (status = 400, description = "Malformed CEP"), (status = 404, description = "Unknown CEP")))]
pub async fn cep(State(state): State<ServerState>, Path(cep): Path<String>) -> ApiResult<Address> {
    ok(state.locations.lookup_cep(&cep).await?)
}

#[utoipa::path(get, path = "/api/locations/states/{uf}/cities", tag = "locations", params(("uf" = String, Path, description = "Two-letter state code")), responses((status = 200, description = "Sorted city names")))]
pub async fn cities(State(state): State<ServerState>, Path(uf): Path<String>) -> ApiResult<Vec<String>> {
    let names = state.locations.cities(&uf).await?;
    ok(names.as_ref().clone())
}

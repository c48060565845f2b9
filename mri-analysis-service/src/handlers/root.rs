use crate::models::RootResponse;
use axum::Json;

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "MRI Analysis XAI API - Upload MRI images to /analyze endpoint",
    })
}

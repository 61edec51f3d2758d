use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use retina_shared::{ClassificationResponse, PredictionFailure};
use serde::Serialize;
use serde_json::json;

use crate::engine::{ClassificationEngine, MAX_UPLOAD_BYTES};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Eye Disease Detection API" }))
}

async fn predict(
    engine: web::Data<ClassificationEngine>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut image_data: Vec<u8> = Vec::new();

    // The first field with content is the image.
    while let Ok(Some(mut field)) = payload.try_next().await {
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            // Past the limit only the length matters; the engine rejects it.
            if image_data.len() <= MAX_UPLOAD_BYTES {
                image_data.extend_from_slice(&data);
            }
        }
        if !image_data.is_empty() {
            break;
        }
    }

    if image_data.is_empty() {
        let resp = ErrorResponse {
            error: "No image file in upload".into(),
        };
        return Ok(HttpResponse::BadRequest().json(resp));
    }

    info!("Received image upload of {} bytes", image_data.len());

    let engine = engine.into_inner();
    let response: ClassificationResponse =
        match web::block(move || engine.classify_bytes(&image_data)).await {
            Ok(response) => response,
            Err(e) => {
                let error_msg = format!("Prediction worker failed: {}", e);
                error!("{}", error_msg);
                PredictionFailure::new(error_msg).into()
            }
        };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceMode;
    use crate::test_fixtures::fixtures::*;
    use actix_web::http::StatusCode;
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::{App, test};
    use serde_json::Value;

    const BOUNDARY: &str = "retina-test-boundary";

    fn multipart_body(file: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"eye.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(file: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/predict")
            .insert_header((
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body(file))
    }

    fn app_data() -> web::Data<ClassificationEngine> {
        web::Data::new(ClassificationEngine::new(InferenceMode::Simulation))
    }

    #[actix_web::test]
    async fn index_describes_the_service() {
        let app = test::init_service(App::new().configure(configure_routes)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Eye Disease Detection API");
    }

    #[actix_web::test]
    async fn predict_returns_classification() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .configure(configure_routes),
        )
        .await;

        let png = encode_png(&uniform_rgb(10, 10, [0, 0, 0]));
        let resp = test::call_service(&app, upload(&png).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "Healthy");
        assert_eq!(body["class"], "No DR");
        assert_eq!(body["model_type"], "Simulation (model unavailable)");
        assert_eq!(body["all_probabilities"].as_object().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn undecodable_upload_is_reported_in_a_200_body() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, upload(b"not an image").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "Error during prediction");
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn empty_upload_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, upload(&[]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No image file in upload");
    }
}

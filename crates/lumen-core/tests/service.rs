//! End-to-end tests of the thumbnail service against the in-memory store.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use lumen_core::{
    Config, MemoryStore, ObjectStore, PipelineError, ProcessPhotoResponse, ServiceError,
    StorageError, ThumbnailService,
};

fn red_square_data_url() -> String {
    let img = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", BASE64.encode(buffer.into_inner()))
}

fn service(store: &MemoryStore) -> ThumbnailService {
    ThumbnailService::with_store(Config::default(), Box::new(store.clone()))
}

fn body(imagem: &str, tamanho: &str, salvar_original: bool) -> Vec<u8> {
    format!(
        r#"{{"imagem": "{imagem}", "tamanho": {tamanho}, "salvar_original": {salvar_original}}}"#
    )
    .into_bytes()
}

#[tokio::test]
async fn red_square_end_to_end() {
    let store = MemoryStore::default();
    let response = service(&store)
        .handle_json(&body(&red_square_data_url(), "[10, 10]", true))
        .await
        .unwrap();

    assert_eq!(response.dimensao_original, [100, 100]);
    assert_eq!(response.dimensao_processada, [10, 10]);
    assert!((response.valor_max - 1.0).abs() < 1e-9);

    assert!(response.arquivo_salvo.starts_with("processadas/"));
    assert!(response.arquivo_salvo.ends_with(".png"));
    assert_eq!(
        response.arquivo_salvo_url,
        format!("memory://fotos/{}", response.arquivo_salvo)
    );
    let original = response.arquivo_original.clone().unwrap();
    assert!(original.starts_with("originais/"));
    assert!(response.arquivo_original_url.is_some());

    assert_eq!(store.len(), 2);
    let stored = store.get("fotos", &response.arquivo_salvo).unwrap();
    assert_eq!(stored.content_type, "image/png");
    assert_eq!(
        BASE64.decode(&response.imagem_processada_base64).unwrap(),
        stored.bytes
    );
    let thumb = image::load_from_memory(&stored.bytes).unwrap().into_luma8();
    assert_eq!(thumb.dimensions(), (10, 10));
    assert!(thumb.pixels().all(|p| p.0[0] == 255));

    let jpeg = store.get("fotos", &original).unwrap();
    assert_eq!(jpeg.content_type, "image/jpeg");
}

#[tokio::test]
async fn original_not_saved_when_disabled() {
    let store = MemoryStore::default();
    let response = service(&store)
        .handle_json(&body(&red_square_data_url(), "[8, 12]", false))
        .await
        .unwrap();

    assert_eq!(response.dimensao_processada, [8, 12]);
    assert!(response.arquivo_original.is_none());
    assert!(response.arquivo_original_url.is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn response_serializes_nulls_for_missing_original() {
    let store = MemoryStore::default();
    let response = service(&store)
        .handle_json(&body(&red_square_data_url(), "[4, 4]", false))
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&response).unwrap();
    assert!(json["arquivo_original"].is_null());
    assert!(json["arquivo_original_url"].is_null());
    assert_eq!(json["dimensao_processada"], serde_json::json!([4, 4]));

    let round: ProcessPhotoResponse = serde_json::from_value(json).unwrap();
    assert_eq!(round, response);
}

#[tokio::test]
async fn malformed_image_makes_no_storage_call() {
    let store = MemoryStore::default();
    let err = service(&store)
        .handle_json(&body("data:image/png;base64", "[10, 10]", true))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::MalformedRequest(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(store.upload_calls(), 0);
}

#[tokio::test]
async fn zero_target_makes_no_storage_call() {
    let store = MemoryStore::default();
    let err = service(&store)
        .handle_json(&body(&red_square_data_url(), "[0, 10]", true))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Pipeline(PipelineError::InvalidDimensions { .. })
    ));
    assert_eq!(store.upload_calls(), 0);
}

#[tokio::test]
async fn undecodable_image_makes_no_storage_call() {
    let store = MemoryStore::default();
    let imagem = format!("data:image/png;base64,{}", BASE64.encode(b"\x89PNG garbage"));
    let err = service(&store)
        .handle_json(&body(&imagem, "[10, 10]", true))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Pipeline(PipelineError::Decode(_))));
    assert_eq!(err.status_code(), 422);
    assert_eq!(store.upload_calls(), 0);
}

#[tokio::test]
async fn storage_failure_fails_request() {
    let store = MemoryStore::failing_after(0);
    let err = service(&store)
        .handle_json(&body(&red_square_data_url(), "[10, 10]", true))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Storage(StorageError::Upload { .. })));
    assert_eq!(err.status_code(), 502);
    assert_eq!(store.upload_calls(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn original_upload_failure_removes_processed_object() {
    let store = MemoryStore::failing_after(1);
    let err = service(&store)
        .handle_json(&body(&red_square_data_url(), "[10, 10]", true))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Storage(_)));
    assert_eq!(store.upload_calls(), 2);
    assert_eq!(store.remove_calls(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn identical_requests_store_identical_thumbnails() {
    let store = MemoryStore::default();
    let svc = service(&store);
    let request = body(&red_square_data_url(), "[7, 9]", false);

    let a = svc.handle_json(&request).await.unwrap();
    let b = svc.handle_json(&request).await.unwrap();

    assert_ne!(a.arquivo_salvo, b.arquivo_salvo);
    assert_eq!(a.imagem_processada_base64, b.imagem_processada_base64);
}

#[tokio::test]
async fn listing_covers_processed_and_originals() {
    let store = MemoryStore::default();
    let svc = service(&store);
    let first = svc
        .handle_json(&body(&red_square_data_url(), "[4, 4]", true))
        .await
        .unwrap();
    let second = svc
        .handle_json(&body(&red_square_data_url(), "[4, 4]", false))
        .await
        .unwrap();
    store
        .upload("fotos", "unrelated/x.png", vec![1], "image/png")
        .await
        .unwrap();

    let listing = svc.list_photos().await.unwrap();
    assert_eq!(listing.total, 3);
    assert_eq!(listing.fotos.len(), 3);
    assert!(listing.fotos.contains(&first.arquivo_salvo));
    assert!(listing.fotos.contains(&first.arquivo_original.unwrap()));
    assert!(listing.fotos.contains(&second.arquivo_salvo));
    assert!(!listing.fotos.iter().any(|p| p.starts_with("unrelated/")));
    let mut sorted = listing.fotos.clone();
    sorted.sort();
    assert_eq!(sorted, listing.fotos);
}

#[tokio::test]
async fn listing_empty_store() {
    let store = MemoryStore::default();
    let listing = service(&store).list_photos().await.unwrap();
    assert_eq!(listing.total, 0);
    assert!(listing.fotos.is_empty());
}

#[tokio::test]
async fn photo_location_resolves_stored_object() {
    let store = MemoryStore::default();
    let svc = service(&store);
    let response = svc
        .handle_json(&body(&red_square_data_url(), "[4, 4]", false))
        .await
        .unwrap();

    let location = svc.photo_location(&response.arquivo_salvo).await.unwrap();
    assert_eq!(location.arquivo, response.arquivo_salvo);
    assert_eq!(location.url, response.arquivo_salvo_url);
}

#[tokio::test]
async fn photo_location_rejects_missing_and_foreign_paths() {
    let store = MemoryStore::default();
    store
        .upload("fotos", "unrelated/x.png", vec![1], "image/png")
        .await
        .unwrap();
    let svc = service(&store);

    let missing = svc
        .photo_location("processadas/2024/01/01/nope.png")
        .await
        .unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));
    assert_eq!(missing.status_code(), 404);

    let foreign = svc.photo_location("unrelated/x.png").await.unwrap_err();
    assert!(matches!(foreign, ServiceError::NotFound(_)));

    for bad in ["", "processadas/../unrelated/x.png", "processadas//a.png"] {
        let err = svc.photo_location(bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedRequest(_)), "{bad:?}");
    }
}

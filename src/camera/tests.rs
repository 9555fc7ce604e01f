use super::*;
use crate::error::JumpError;
use std::sync::Arc;

async fn manager_with(count: u32) -> (Arc<SimulatedCameraProvider>, CameraResourceManager) {
    let provider = Arc::new(SimulatedCameraProvider::new(count));
    let manager = CameraResourceManager::new(provider.clone())
        .await
        .expect("simulated provider has devices");
    (provider, manager)
}

#[tokio::test]
async fn test_no_camera_available() {
    let provider = Arc::new(SimulatedCameraProvider::new(0));
    let result = CameraResourceManager::new(provider).await;
    assert!(matches!(result, Err(JumpError::NoCameraAvailable)));
}

#[tokio::test]
async fn test_enumeration() {
    let (_, manager) = manager_with(3).await;
    let devices = manager.devices();
    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0].facing, CameraFacing::Back);
    assert_eq!(devices[1].facing, CameraFacing::Front);
    assert_eq!(devices[2].name, "external-2");
    assert!(!manager.is_acquired());
}

#[tokio::test]
async fn test_sparse_device_indices() {
    let provider = Arc::new(SimulatedCameraProvider::with_indices([0, u32::MAX]));
    let mut manager = CameraResourceManager::new(provider.clone()).await.unwrap();
    assert_eq!(manager.devices().len(), 2);
    assert_eq!(manager.devices()[1].name, format!("external-{}", u32::MAX));

    manager.acquire(0).await.unwrap();
    manager.switch_to(u32::MAX).await.unwrap();
    assert_eq!(manager.current_device(), Some(u32::MAX));
    assert_eq!(provider.peak_open_count(), 1);
}

#[tokio::test]
async fn test_acquire_and_release() {
    let (provider, mut manager) = manager_with(2).await;

    let handle = manager.acquire(0).await.unwrap();
    assert_eq!(handle.device_index(), 0);
    assert_eq!(provider.open_count(), 1);
    let held = manager.current().map(|h| (h.id(), h.opened_at()));
    assert!(held.is_some_and(|(_, opened_at)| opened_at <= std::time::Instant::now()));

    // Acquiring the held device again is a no-op
    manager.acquire(0).await.unwrap();
    assert_eq!(provider.total_opens(), 1);

    // A different device needs a switch
    assert!(matches!(
        manager.acquire(1).await,
        Err(JumpError::ResourceUnavailable { .. })
    ));

    assert_eq!(manager.release().await, Some(0));
    assert!(manager.current().is_none());
    assert_eq!(manager.release().await, None);
    assert_eq!(provider.open_count(), 0);
}

#[tokio::test]
async fn test_acquire_unknown_device() {
    let (provider, mut manager) = manager_with(1).await;
    assert!(matches!(
        manager.acquire(5).await,
        Err(JumpError::ResourceUnavailable { .. })
    ));
    assert_eq!(provider.open_count(), 0);
}

#[tokio::test]
async fn test_switch_releases_before_acquiring() {
    let (provider, mut manager) = manager_with(2).await;
    manager.acquire(0).await.unwrap();

    let handle = manager.switch_to(1).await.unwrap();
    assert_eq!(handle.device_index(), 1);
    assert_eq!(provider.open_count(), 1);
    assert_eq!(provider.peak_open_count(), 1);

    manager.switch_to(0).await.unwrap();
    assert_eq!(manager.current_device(), Some(0));
    assert_eq!(provider.peak_open_count(), 1);
}

#[tokio::test]
async fn test_switch_failure_rolls_back() {
    let (provider, mut manager) = manager_with(2).await;
    manager.acquire(0).await.unwrap();
    provider.fail_device(1);

    match manager.switch_to(1).await {
        Err(JumpError::AcquisitionFailed {
            device,
            rolled_back,
            ..
        }) => {
            assert_eq!(device, 1);
            assert!(rolled_back);
        }
        other => panic!("Expected rollback, got {:?}", other.map(|h| h.device_index())),
    }
    assert_eq!(manager.current_device(), Some(0));
    assert_eq!(provider.open_count(), 1);
}

#[tokio::test]
async fn test_switch_failure_without_rollback() {
    let (provider, mut manager) = manager_with(2).await;
    manager.acquire(0).await.unwrap();
    provider.fail_device(0);
    provider.fail_device(1);

    match manager.switch_to(1).await {
        Err(JumpError::AcquisitionFailed { rolled_back, .. }) => assert!(!rolled_back),
        other => panic!("Expected clean failure, got {:?}", other.map(|h| h.device_index())),
    }
    assert!(!manager.is_acquired());
    assert_eq!(provider.open_count(), 0);

    provider.restore_device(1);
    manager.switch_to(1).await.unwrap();
    assert_eq!(manager.current_device(), Some(1));
}

#[tokio::test]
async fn test_switch_to_unknown_device_keeps_handle() {
    let (provider, mut manager) = manager_with(2).await;
    manager.acquire(1).await.unwrap();

    assert!(matches!(
        manager.switch_to(9).await,
        Err(JumpError::AcquisitionFailed {
            rolled_back: true,
            ..
        })
    ));
    assert_eq!(manager.current_device(), Some(1));
    assert_eq!(provider.total_opens(), 1);
}

//! Integration tests for wishlist selection and bulk actions.
//!
//! The backend is mocked with wiremock. Refreshes are scripted with
//! `up_to_n_times(1)` so the first `GET /wishlist` returns the initial list
//! and later ones return what the server would hold afterwards.

use std::time::Duration;

use serde_json::{Value, json};
use storefront_business::{
    AUTH_TOKEN_KEY, BusyStatus, NoticeLevel, SessionSlot, StorefrontConfig, StorefrontError,
    ValidationError, WishlistApi, WishlistController,
};
use storefront_states::MemoryStore;
use ustr::Ustr;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item(id: &str, stock_status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Item {id}"),
        "price": 19.99,
        "stock_status": stock_status,
        "image_url": null,
        "added_at": "2026-03-01T12:00:00Z"
    })
}

fn items(ids: &[&str]) -> Value {
    json!({ "items": ids.iter().map(|id| item(id, "in_stock")).collect::<Vec<_>>() })
}

fn id(name: &str) -> Ustr {
    Ustr::from(name)
}

/// Mounts `GET /wishlist` answering `first` once, then `after` for every refresh.
async fn mount_wishlist(server: &MockServer, first: Value, after: Value) {
    Mock::given(method("GET"))
        .and(path("/api/wishlist"))
        .and(header("authorization", "Bearer shopper-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(after))
        .mount(server)
        .await;
}

async fn mount_move_to_cart(server: &MockServer, item_id: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/api/wishlist/items/{item_id}/cart")))
        .and(header("authorization", "Bearer shopper-token"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// Starts a mock server and mounts a controller that has finished its first load.
async fn setup_wishlist_test(first: Value, after: Value) -> (MockServer, WishlistController) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mock_server = MockServer::start().await;
    mount_wishlist(&mock_server, first, after).await;

    let store = MemoryStore::shared();
    store
        .set(AUTH_TOKEN_KEY, "shopper-token")
        .expect("memory store accepts writes");

    let api = WishlistApi::new(StorefrontConfig::new(mock_server.uri()));
    let mut controller =
        WishlistController::mount(api, &SessionSlot::new(store)).expect("auth token present");
    controller.settle().await;

    (mock_server, controller)
}

#[tokio::test]
async fn test_mount_loads_wishlist() {
    let (_server, controller) = setup_wishlist_test(items(&["a", "b", "c"]), items(&[])).await;

    assert!(!controller.is_loading());
    let ids: Vec<Ustr> = controller.items().iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![id("a"), id("b"), id("c")]);
    assert!(controller.selection().is_empty());
}

#[tokio::test]
async fn test_load_accepts_bare_array() {
    let bare = json!([item("a", "in_stock"), item("b", "out_of_stock")]);
    let (_server, controller) = setup_wishlist_test(bare, items(&[])).await;

    assert_eq!(controller.items().len(), 2);
    assert!(controller.can_add(id("a")));
    assert!(!controller.can_add(id("b")), "out of stock rows cannot be added");
}

#[tokio::test]
async fn test_bulk_add_with_one_failure() {
    let (server, mut controller) =
        setup_wishlist_test(items(&["a", "b", "c"]), items(&["b"])).await;

    mount_move_to_cart(&server, "a", ResponseTemplate::new(200)).await;
    mount_move_to_cart(
        &server,
        "b",
        ResponseTemplate::new(409).set_body_json(json!({ "message": "Out of stock" })),
    )
    .await;
    mount_move_to_cart(&server, "c", ResponseTemplate::new(200)).await;

    controller.toggle_select_all();
    assert_eq!(controller.selection().selected_count(), 3);

    controller.bulk_add_selected().expect("selection is not empty");
    assert!(controller.is_bulk_running());
    controller.settle().await;

    assert!(!controller.is_bulk_running());
    assert!(controller.selection().is_empty());
    assert!(!controller.selection().any_busy());
    assert_eq!(controller.selection().item_error(id("b")), Some("Out of stock"));

    let ids: Vec<Ustr> = controller.items().iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![id("b")], "refresh pruned the moved items");

    let notice = controller.notices_mut().latest().cloned().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Moved 2 of 3 items to cart");
}

#[tokio::test]
async fn test_bulk_add_is_sequential_in_list_order() {
    let (server, mut controller) =
        setup_wishlist_test(items(&["a", "b", "c"]), items(&[])).await;

    for item_id in ["a", "b", "c"] {
        mount_move_to_cart(
            &server,
            item_id,
            ResponseTemplate::new(200).set_delay(Duration::from_millis(20)),
        )
        .await;
    }

    controller.toggle_select(id("c"));
    controller.toggle_select(id("a"));
    controller.toggle_select(id("b"));
    controller.bulk_add_selected().expect("selection is not empty");
    controller.settle().await;

    let requests = server.received_requests().await.expect("recording enabled");
    let posted: Vec<String> = requests
        .iter()
        .filter(|request| request.method.as_str() == "POST")
        .map(|request| request.url.path().to_owned())
        .collect();
    assert_eq!(
        posted,
        vec![
            "/api/wishlist/items/a/cart",
            "/api/wishlist/items/b/cart",
            "/api/wishlist/items/c/cart",
        ]
    );

    let notice = controller.notices_mut().latest().cloned().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Moved 3 of 3 items to cart");
    assert!(controller.items().is_empty());
}

#[tokio::test]
async fn test_bulk_add_marks_rows_busy_one_at_a_time() {
    let (server, mut controller) = setup_wishlist_test(items(&["a", "b"]), items(&[])).await;

    mount_move_to_cart(
        &server,
        "a",
        ResponseTemplate::new(200).set_delay(Duration::from_millis(50)),
    )
    .await;
    mount_move_to_cart(&server, "b", ResponseTemplate::new(200)).await;

    controller.toggle_select_all();
    controller.bulk_add_selected().expect("selection is not empty");

    controller.next_update().await;
    assert_eq!(controller.selection().busy(id("a")), BusyStatus::Adding);
    assert_eq!(controller.selection().busy(id("b")), BusyStatus::Idle);

    controller.settle().await;
    assert!(!controller.selection().any_busy());
}

#[tokio::test]
async fn test_bulk_add_with_empty_selection_makes_no_request() {
    let (server, mut controller) = setup_wishlist_test(items(&["a"]), items(&["a"])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = controller.bulk_add_selected();

    assert_eq!(
        result,
        Err(StorefrontError::Validation(ValidationError::NothingSelected))
    );
    let notice = controller.notices_mut().latest().cloned().expect("notice");
    assert_eq!(notice.message, "Please select at least one item");
}

#[tokio::test]
async fn test_single_add_refreshes_wishlist() {
    let (server, mut controller) = setup_wishlist_test(items(&["a", "b"]), items(&["b"])).await;

    mount_move_to_cart(&server, "a", ResponseTemplate::new(200)).await;

    controller.toggle_select(id("a"));
    controller.add_single_item(id("a")).expect("row is idle");
    assert_eq!(controller.selection().busy(id("a")), BusyStatus::Adding);
    assert_eq!(
        controller.add_single_item(id("a")),
        Err(StorefrontError::Validation(ValidationError::Busy))
    );
    controller.settle().await;

    let ids: Vec<Ustr> = controller.items().iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![id("b")]);
    assert!(!controller.selection().is_selected(id("a")));
    assert!(!controller.selection().any_busy());
}

#[tokio::test]
async fn test_single_add_failure_records_row_error() {
    let (server, mut controller) = setup_wishlist_test(items(&["a"]), items(&["a"])).await;

    mount_move_to_cart(
        &server,
        "a",
        ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Price changed"
        })),
    )
    .await;

    controller.add_single_item(id("a")).expect("row is idle");
    controller.settle().await;

    assert_eq!(controller.selection().item_error(id("a")), Some("Price changed"));
    assert_eq!(controller.items().len(), 1);
    let notice = controller.notices_mut().latest().cloned().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Price changed");
}

#[tokio::test]
async fn test_removing_selected_item_prunes_selection() {
    let (server, mut controller) =
        setup_wishlist_test(items(&["a", "b", "c"]), items(&["b", "c"])).await;

    Mock::given(method("DELETE"))
        .and(path("/api/wishlist/items/a"))
        .and(header("authorization", "Bearer shopper-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    controller.toggle_select_all();
    controller.remove_item(id("a")).expect("row is idle");
    assert_eq!(controller.selection().busy(id("a")), BusyStatus::Removing);
    controller.settle().await;

    assert!(!controller.selection().is_selected(id("a")));
    assert!(!controller.selection().is_busy(id("a")));
    assert_eq!(controller.selection().selected_count(), 2);
    assert!(
        controller.selection().all_selected(),
        "the remaining rows are still all selected"
    );
    let ids: Vec<Ustr> = controller.items().iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![id("b"), id("c")]);
}

#[tokio::test]
async fn test_failed_remove_keeps_item() {
    let (server, mut controller) = setup_wishlist_test(items(&["a"]), items(&["a"])).await;

    Mock::given(method("DELETE"))
        .and(path("/api/wishlist/items/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    controller.remove_item(id("a")).expect("row is idle");
    controller.settle().await;

    assert_eq!(controller.items().len(), 1);
    assert!(!controller.selection().is_busy(id("a")));
    assert_eq!(
        controller.selection().item_error(id("a")),
        Some("Server error (status 500)")
    );
}

#[tokio::test]
async fn test_new_row_action_survives_previous_task_settling() {
    let (server, mut controller) = setup_wishlist_test(items(&["a"]), items(&[])).await;

    mount_move_to_cart(&server, "a", ResponseTemplate::new(500)).await;
    Mock::given(method("DELETE"))
        .and(path("/api/wishlist/items/a"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    controller.add_single_item(id("a")).expect("row is idle");
    // The add result frees the row; its task has not retired yet.
    controller.next_update().await;
    assert!(!controller.selection().is_busy(id("a")));

    controller.remove_item(id("a")).expect("row is free again");
    // The add task retires now and must leave the remove's flag alone.
    controller.next_update().await;

    assert_eq!(controller.selection().busy(id("a")), BusyStatus::Removing);
    assert_eq!(
        controller.remove_item(id("a")),
        Err(StorefrontError::Validation(ValidationError::Busy))
    );

    controller.settle().await;
    assert!(controller.items().is_empty());
    assert!(!controller.selection().any_busy());
}

#[tokio::test]
async fn test_slow_refresh_does_not_restore_removed_item() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&["a", "b"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // The refresh after adding `a` was answered before `b` was deleted.
    Mock::given(method("GET"))
        .and(path("/api/wishlist"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(items(&["b"]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_move_to_cart(&server, "a", ResponseTemplate::new(200)).await;
    Mock::given(method("DELETE"))
        .and(path("/api/wishlist/items/b"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::shared();
    store
        .set(AUTH_TOKEN_KEY, "shopper-token")
        .expect("memory store accepts writes");
    let api = WishlistApi::new(StorefrontConfig::new(server.uri()));
    let mut controller =
        WishlistController::mount(api, &SessionSlot::new(store)).expect("auth token present");
    controller.settle().await;

    controller.add_single_item(id("a")).expect("row is idle");
    // Applying the add result starts the slow refresh.
    controller.next_update().await;
    assert!(controller.is_loading());

    controller.remove_item(id("b")).expect("row is idle");
    controller.settle().await;

    assert!(
        controller.items().is_empty(),
        "removed item came back: {:?}",
        controller.items()
    );
    assert!(!controller.selection().contains(id("b")));
}

#[tokio::test]
async fn test_mount_without_auth_token_is_session_expired() {
    let api = WishlistApi::new(StorefrontConfig::new("http://127.0.0.1:9"));

    let result = WishlistController::mount(api, &SessionSlot::new(MemoryStore::shared()));

    assert!(matches!(result, Err(StorefrontError::SessionExpired)));
}

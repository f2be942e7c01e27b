use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

mod common;
use common::TestServer;

#[tokio::test]
async fn phases_page_in_position_order() -> Result<()> {
    let server = TestServer::start().await?;
    let first = server.create_board("Other").await?;
    let board_id = server.create_board("Paged").await?;
    assert_eq!(board_id, 2);

    // Inserted out of order so the sort does the work
    for position in [7, 3, 12, 1, 9, 5, 11, 2, 8, 4, 10, 6] {
        let res = server
            .write(
                Method::POST,
                "phases",
                json!({ "title": format!("Phase {}", position), "board_id": board_id, "position": position }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    }
    server
        .write(Method::POST, "phases", json!({ "title": "Elsewhere", "board_id": first, "position": 1 }))
        .await?;

    let res = server
        .get("phases?board_id=2&page=2&per_page=5&order_by=position&order=asc")
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.header("X-WP-Total"), Some("12"));
    assert_eq!(res.header("X-WP-TotalPages"), Some("3"));

    let positions: Vec<i64> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, vec![6, 7, 8, 9, 10]);
    Ok(())
}

#[tokio::test]
async fn task_filters_are_combined() -> Result<()> {
    let server = TestServer::start().await?;
    let tasks = [
        json!({ "content": "a", "board_id": 1, "card_id": 1, "user_id": 1 }),
        json!({ "content": "b", "board_id": 1, "card_id": 2, "user_id": 1 }),
        json!({ "content": "c", "board_id": 1, "card_id": 1, "user_id": 2 }),
        json!({ "content": "d", "board_id": 2, "card_id": 1, "user_id": 1 }),
    ];
    for task in tasks {
        let res = server.write(Method::POST, "tasks", task).await?;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    }

    let res = server.get("tasks?board_id=1&card_id=1&user_id=1").await?;
    assert_eq!(res.status, StatusCode::OK);
    let rows = res.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["content"], "a");

    let res = server.get("tasks?board_id=1").await?;
    assert_eq!(res.header("X-WP-Total"), Some("3"));

    let res = server.get("tasks?board_id=0&user_id=1").await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = server.get("tasks?board_id=abc").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn listing_rejects_bad_paging_and_ordering() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("boards?page=0").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "rest_invalid_param");

    let res = server.get("boards?order_by=").await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Invaild order field passed.");

    let res = server.get("boards?order_by=title&order=").await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Invaild order passed.");

    let res = server.get("boards?order_by=no_such_column").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = server.get("boards?order_by=title&order=sideways").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn per_page_is_capped() -> Result<()> {
    let server = TestServer::start().await?;
    for n in 0..3 {
        server.write(Method::POST, "taskslists", json!({ "title": format!("List {}", n), "tasks": [n] })).await?;
    }

    let res = server.get("taskslists?per_page=1000").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body.as_array().unwrap().len(), 3);
    assert_eq!(res.header("X-WP-TotalPages"), Some("1"));

    let res = server.get("taskslists?per_page=2&page=2&order_by=taskslist_id").await?;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["tasks"], json!([2]));
    Ok(())
}

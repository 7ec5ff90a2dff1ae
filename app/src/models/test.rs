use chrono::{Duration, Utc};
use senser_core::{BucketWidth, TimeSeriesRow};
use std::time;

use super::sensor;
use super::sensor_data;
use super::*;

// These run against a live Postgres/Timescale instance from DATABASE_URL

async fn connect() -> sqlx::PgPool {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").unwrap();
    establish_db_connection(&url, time::Duration::from_secs(5))
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_db_connection() {
    let conn = connect().await;
    assert!(sensor::read(&conn, 0, 1).await.unwrap().len() <= 1);
}

#[tokio::test]
#[ignore]
async fn crud_sensors() {
    let conn = connect().await;
    let name = format!("models-test-{}", Utc::now().timestamp_nanos_opt().unwrap());

    // create
    let dao = sensor::insert(&conn, &name).await.unwrap();
    assert_eq!(&name, dao.name());
    assert!(sensor::insert(&conn, &name)
        .await
        .unwrap_err()
        .is_unique_violation());

    // read
    let by_id = sensor::get(&conn, dao.id()).await.unwrap().unwrap();
    assert_eq!(dao.id(), by_id.id());
    let by_name = sensor::get_by_name(&conn, &name).await.unwrap().unwrap();
    assert_eq!(dao.id(), by_name.id());
    assert!(!sensor::read(&conn, 0, 100).await.unwrap().is_empty());

    // delete
    assert!(sensor::delete(&conn, dao.id()).await.unwrap());
    assert!(!sensor::delete(&conn, dao.id()).await.unwrap());
    assert!(sensor::get(&conn, dao.id()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn crud_sensor_data() {
    let conn = connect().await;
    let name = format!("models-data-{}", Utc::now().timestamp_nanos_opt().unwrap());
    let dao = sensor::insert(&conn, &name).await.unwrap();
    let now = Utc::now();

    // insert
    for (offset, temperature) in [(3, 20.0), (2, 22.0), (1, 24.0)] {
        let row = TimeSeriesRow {
            temperature: Some(temperature),
            humidity: Some(50.0),
            velocity: None,
            battery_level: 0.5,
            last_seen: now - Duration::minutes(offset),
        };
        sensor_data::insert(&conn, dao.id(), &row).await.unwrap();
    }

    // query
    let buckets = sensor_data::get_buckets(
        &conn,
        dao.id(),
        now - Duration::hours(1),
        now,
        "1 day".parse::<BucketWidth>().unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(1, buckets.len());
    assert_eq!(3, buckets[0].samples);
    assert_eq!(Some(20.0), buckets[0].min_temperature);
    assert_eq!(Some(24.0), buckets[0].max_temperature);

    sensor::delete(&conn, dao.id()).await.unwrap();
}

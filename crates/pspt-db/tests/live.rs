//! Postgres-backed tests for pspt-db using `#[sqlx::test]`.
//!
//! Every test runs against its own throwaway database. All but the schema
//! test start from the workspace `migrations/` directory already applied.

use chrono::{Duration, Utc};
use pspt_core::{
    DurationMonths, NewCountry, PriceFilter, PriceSortKey, PriceStore, PriceUpsert,
    RefreshStatus, SortDirection, StoreError, Tier,
};
use pspt_db::{seed_countries, PgPriceStore};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_country(name: &str, iso: &str, region: &str) -> NewCountry {
    NewCountry {
        name: name.to_string(),
        iso_code: iso.to_string(),
        region_identifier: region.to_string(),
        source_url: None,
    }
}

fn upsert(
    country_id: i64,
    tier: Tier,
    duration: DurationMonths,
    price: Decimal,
    currency: &str,
    expires_in: Duration,
) -> PriceUpsert {
    let now = Utc::now();
    PriceUpsert {
        country_id,
        tier,
        duration_months: duration,
        currency: currency.to_string(),
        price,
        source_url: "https://www.playstation.com/ps-plus/".to_string(),
        last_updated: now,
        cache_expires_at: now + expires_in,
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn migrations_report_only_newly_applied_files(pool: sqlx::PgPool) {
    pspt_db::ping(&pool).await.expect("ping");

    let first = pspt_db::run_migrations(&pool).await.expect("first run");
    assert_eq!(first, 1);

    let second = pspt_db::run_migrations(&pool).await.expect("second run");
    assert_eq!(second, 0);

    let store = PgPriceStore::new(pool);
    assert!(store.list_countries().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Countries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_and_lookup_country(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    let jp = store
        .insert_country(&new_country("Japan", "jp", "JA-JP"))
        .await
        .expect("insert");

    assert_eq!(jp.iso_code, "JP");
    assert_eq!(jp.region_identifier, "ja-jp");

    let by_iso = store.get_country_by_iso("jp").await.unwrap().unwrap();
    assert_eq!(by_iso.id, jp.id);
    let by_id = store.get_country_by_id(jp.id).await.unwrap().unwrap();
    assert_eq!(by_id.name, "Japan");
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_iso_is_reported(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    store
        .insert_country(&new_country("Japan", "JP", "ja-jp"))
        .await
        .unwrap();
    let err = store
        .insert_country(&new_country("Japan again", "JP", "en-jp"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateCountry(iso) if iso == "JP"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_if_missing_skips_known_iso_and_lists_by_name(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    store
        .insert_country(&new_country("Japan", "JP", "ja-jp"))
        .await
        .unwrap();

    let inserted = store
        .insert_countries_if_missing(&[
            new_country("Japan", "JP", "ja-jp"),
            new_country("Brazil", "BR", "pt-br"),
            new_country("Austria", "AT", "de-at"),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let names: Vec<String> = store
        .list_countries()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Austria", "Brazil", "Japan"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_country_cascades(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    let us = store
        .insert_country(&new_country("United States", "US", "en-us"))
        .await
        .unwrap();
    store
        .upsert_prices(&[upsert(
            us.id,
            Tier::Essential,
            DurationMonths::One,
            Decimal::new(999, 2),
            "USD",
            Duration::hours(6),
        )])
        .await
        .unwrap();
    store
        .upsert_sync_status(us.id, RefreshStatus::Ok, None)
        .await
        .unwrap();

    assert!(store.delete_country(us.id).await.unwrap());
    assert!(!store.delete_country(us.id).await.unwrap());
    assert_eq!(store.count_prices().await.unwrap(), 0);
    assert!(store.get_sync_status(us.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_updates_existing_rows(pool: sqlx::PgPool) {
    let first = seed_countries(&pool, &[new_country("Britain", "GB", "en-gb")])
        .await
        .unwrap();
    let second = seed_countries(&pool, &[new_country("United Kingdom", "GB", "en-gb")])
        .await
        .unwrap();
    assert_eq!((first, second), (1, 1));

    let store = PgPriceStore::new(pool);
    let gb = store.get_country_by_iso("GB").await.unwrap().unwrap();
    assert_eq!(gb.name, "United Kingdom");
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_overwrites_same_plan(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    let de = store
        .insert_country(&new_country("Germany", "DE", "de-de"))
        .await
        .unwrap();

    let plan = |price| {
        upsert(
            de.id,
            Tier::Premium,
            DurationMonths::Twelve,
            price,
            "EUR",
            Duration::hours(6),
        )
    };
    store.upsert_prices(&[plan(Decimal::new(15199, 2))]).await.unwrap();
    store.upsert_prices(&[plan(Decimal::new(16199, 2))]).await.unwrap();

    let rows = store.get_country_prices(de.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].price, Decimal::new(16199, 2));
    assert_eq!(rows[0].tier, Tier::Premium);
}

#[sqlx::test(migrations = "../../migrations")]
async fn freshness_requires_rows_and_unexpired_minimum(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    let fr = store
        .insert_country(&new_country("France", "FR", "fr-fr"))
        .await
        .unwrap();
    let now = Utc::now();

    assert!(!store.are_country_prices_fresh(fr.id, now).await.unwrap());

    store
        .upsert_prices(&[
            upsert(fr.id, Tier::Essential, DurationMonths::One, Decimal::new(899, 2), "EUR", Duration::hours(6)),
            upsert(fr.id, Tier::Extra, DurationMonths::One, Decimal::new(1399, 2), "EUR", Duration::hours(1)),
        ])
        .await
        .unwrap();
    assert!(store.are_country_prices_fresh(fr.id, now).await.unwrap());
    assert!(!store
        .are_country_prices_fresh(fr.id, now + Duration::hours(2))
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_prices_filters_searches_and_sorts(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    let us = store
        .insert_country(&new_country("United States", "US", "en-us"))
        .await
        .unwrap();
    let jp = store
        .insert_country(&new_country("Japan", "JP", "ja-jp"))
        .await
        .unwrap();
    let h = Duration::hours(6);
    store
        .upsert_prices(&[
            upsert(us.id, Tier::Essential, DurationMonths::One, Decimal::new(999, 2), "USD", h),
            upsert(us.id, Tier::Premium, DurationMonths::Twelve, Decimal::new(15999, 2), "USD", h),
            upsert(jp.id, Tier::Essential, DurationMonths::One, Decimal::new(850, 0), "JPY", h),
        ])
        .await
        .unwrap();

    let all = store.list_prices(&PriceFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].country_name, "Japan");

    let by_country = store
        .list_prices(&PriceFilter {
            country: Some("us".to_string()),
            ..PriceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_country.len(), 2);

    let by_plan = store
        .list_prices(&PriceFilter {
            tier: Some(Tier::Essential),
            duration: Some(DurationMonths::One),
            ..PriceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_plan.len(), 2);

    let search = store
        .list_prices(&PriceFilter {
            search: Some("jpy".to_string()),
            ..PriceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].iso_code, "JP");

    let by_price = store
        .list_prices(&PriceFilter {
            sort_by: PriceSortKey::Price,
            sort_dir: SortDirection::Desc,
            ..PriceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_price[0].price, Decimal::new(850, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_status_round_trips(pool: sqlx::PgPool) {
    let store = PgPriceStore::new(pool);
    let it = store
        .insert_country(&new_country("Italy", "IT", "it-it"))
        .await
        .unwrap();

    store
        .upsert_sync_status(it.id, RefreshStatus::Error, Some("No parsable price data returned from source"))
        .await
        .unwrap();
    store
        .upsert_sync_status(it.id, RefreshStatus::Ok, None)
        .await
        .unwrap();

    let status = store.get_sync_status(it.id).await.unwrap().unwrap();
    assert_eq!(status.status, RefreshStatus::Ok);
    assert!(status.error_message.is_none());
}

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use db::engine::Engine;
use db::query::parse_query;
use index::KeyValue;
use tempfile::TempDir;

const HEADER: &str = "month,town,flat_type,block,street_name,storey_range,floor_area_sqm,flat_model,lease_commence_date,resale_price";

const ROWS: &[&str] = &[
    "2015-08,ANG MO KIO,3 ROOM,101,ANG MO KIO AVE 3,01 TO 03,67,Improved,1979,300000",
    "2015-09,ANG MO KIO,4 ROOM,102,ANG MO KIO AVE 4,04 TO 06,92,New Generation,1980,420000",
    "2015-09,BEDOK,5 ROOM,55,BEDOK NTH RD,07 TO 09,110,Improved,1985,520000",
    "2015-10,BEDOK,3 ROOM,56,BEDOK NTH RD,01 TO 03,65,Standard,1978,280000",
    "2015-10,YISHUN,4 ROOM,88,YISHUN RING RD,10 TO 12,84,Model A,1990,360000",
    "2015-11,YISHUN,EXECUTIVE,90,YISHUN AVE 5,04 TO 06,142,Maisonette,1988,610000",
];

fn write_sample_csv(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("resale.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in ROWS {
        writeln!(file, "{}", row).unwrap();
    }
    path
}

#[test]
fn ingest_build_and_query() {
    let dir = TempDir::new().unwrap();
    let csv = write_sample_csv(&dir);
    let data_dir = dir.path().join("data");

    let engine = Engine::open(&data_dir, Some(&csv)).unwrap();
    assert_eq!(engine.row_count(), 6);

    let predicates = parse_query("month=2015-09..2015-10 floor_area_sqm>=80").unwrap();
    let ids = engine.search(&predicates).unwrap();
    assert_eq!(ids, vec![1, 2, 4]);

    let rows = engine.project(&ids, &["town", "resale_price"]).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].values[0], KeyValue::Text("ANG MO KIO".to_string()));
    assert_eq!(rows[2].values[1], KeyValue::Real(360000.0));
}

#[test]
fn reopen_uses_persisted_columns_and_indexes() {
    let dir = TempDir::new().unwrap();
    let csv = write_sample_csv(&dir);
    let data_dir = dir.path().join("data");

    {
        let engine = Engine::open(&data_dir, Some(&csv)).unwrap();
        assert_eq!(engine.row_count(), 6);
    }

    // Second open gets no CSV: everything must come from disk.
    let engine = Engine::open(&data_dir, None).unwrap();
    assert_eq!(engine.row_count(), 6);

    let predicates = parse_query("town=BEDOK").unwrap();
    assert_eq!(engine.search(&predicates).unwrap(), vec![2, 3]);
}

#[test]
fn stale_indexes_are_rebuilt() {
    let dir = TempDir::new().unwrap();
    let csv = write_sample_csv(&dir);
    let data_dir = dir.path().join("data");

    {
        Engine::open(&data_dir, Some(&csv)).unwrap();
    }
    std::fs::remove_dir_all(data_dir.join("index")).unwrap();

    let engine = Engine::open(&data_dir, None).unwrap();
    let predicates = parse_query("lease_commence_date>=1985").unwrap();
    assert_eq!(engine.search(&predicates).unwrap(), vec![2, 4, 5]);
}

#[test]
fn unfiltered_query_returns_every_record() {
    let dir = TempDir::new().unwrap();
    let csv = write_sample_csv(&dir);
    let data_dir = dir.path().join("data");

    let engine = Engine::open(&data_dir, Some(&csv)).unwrap();
    let ids = engine.search(&[]).unwrap();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn conjunction_across_three_columns() {
    let dir = TempDir::new().unwrap();
    let csv = write_sample_csv(&dir);
    let data_dir = dir.path().join("data");

    let engine = Engine::open(&data_dir, Some(&csv)).unwrap();
    let predicates =
        parse_query("town=YISHUN floor_area_sqm>=80 resale_price<400000").unwrap();
    assert_eq!(engine.search(&predicates).unwrap(), vec![4]);
}

#[test]
fn missing_data_and_missing_csv_is_an_error() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    assert!(Engine::open(&data_dir, None).is_err());
}

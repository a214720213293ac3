//! End-to-end tests: import batches into a file-backed database and query
//! the service.

mod common;

use std::sync::Arc;
use std::thread;

use common::{BatchBuilder, TestHarness};
use payroll::model::{Money, MAX_PAY};
use payroll::{Percentile, SizeClass};

fn two_villages(harness: &TestHarness, year: i32) {
    harness.import(
        &BatchBuilder::new(year)
            .responding_agency("Illinois Comptroller")
            .record("OAK PARK", None, "VILLAGE MANAGER", ("ANN", "LEE"), 30_000)
            .record("OAK PARK", Some("POLICE"), "OFFICER", ("BOB", "RAY"), 45_000)
            .record("EVANSTON", None, "CITY MANAGER", ("CY", "DEE"), 45_000)
            .record("EVANSTON", Some("POLICE"), "SERGEANT", ("DOT", "FOX"), 90_000)
            .build(),
    );
}

#[test]
fn test_import_then_classify_then_rank() {
    let mut harness = TestHarness::new();
    two_villages(&harness, 2017);

    let salaries = harness.salary_ids(2017);
    assert_eq!(salaries.len(), 4);

    // Unclassified until a taxonomy is assigned.
    assert_eq!(
        harness.service.like_employer_percentile(salaries[0]).unwrap(),
        Percentile::NotApplicable
    );

    let municipal = harness.taxonomy("Municipal", false, false);
    let police = harness.universe("Police Department");
    harness.classify_unit(harness.unit("OAK PARK"), municipal);
    let oak_park_police = harness.department("OAK PARK", "POLICE");
    harness.classify_department(oak_park_police, police);

    // Oak Park is classified, Evanston is not: only Oak Park's salaries.
    let result = harness.service.salary_percentiles(salaries[1]).unwrap();
    assert_eq!(result.year, 2017);
    assert_eq!(result.total_pay, Money::from_dollars(45_000));
    assert_eq!(result.like_employer_percentile, Percentile::Rank(100.0));
    assert_eq!(result.employer_percentile, Percentile::Rank(100.0));

    harness.classify_unit(harness.unit("EVANSTON"), municipal);
    let ranked = harness.service.like_employer_percentile(salaries[0]).unwrap();
    assert_eq!(ranked, Percentile::Rank(0.0));
    let ranked = harness.service.like_employer_percentile(salaries[2]).unwrap();
    assert!((ranked.value().unwrap() - 66.67).abs() < 0.01);
    // Evanston's police department has no universe of its own.
    assert_eq!(
        harness.service.like_employer_percentile(salaries[3]).unwrap(),
        Percentile::NotApplicable
    );

    // Evanston police has no universe.
    assert!(!harness
        .service
        .is_comparable(harness.department("EVANSTON", "POLICE"))
        .unwrap());
    assert!(harness.service.is_comparable(oak_park_police).unwrap());
}

#[test]
fn test_department_under_unclassified_unit_has_no_data() {
    let mut harness = TestHarness::new();
    two_villages(&harness, 2017);

    let police = harness.universe("Police Department");
    let evanston_police = harness.department("EVANSTON", "POLICE");
    harness.classify_department(evanston_police, police);

    let salaries = harness.salary_ids(2017);
    assert_eq!(
        harness.service.like_employer_percentile(salaries[3]).unwrap(),
        Percentile::NoData
    );
    let json = serde_json::to_value(harness.service.salary_percentiles(salaries[3]).unwrap())
        .unwrap();
    assert_eq!(json["likeEmployerPercentile"], serde_json::Value::Null);
    assert_eq!(json["employerPercentile"], serde_json::json!(100.0));
}

#[test]
fn test_population_and_size_class_through_service() {
    let mut harness = TestHarness::new();
    two_villages(&harness, 2017);
    let oak_park = harness.unit("OAK PARK");

    assert_eq!(harness.service.get_population(oak_park, None).unwrap(), None);
    assert_eq!(harness.service.size_class(oak_park, None).unwrap(), None);

    let municipal = harness.taxonomy("Municipal", false, false);
    harness.classify_unit(oak_park, municipal);
    harness.population(oak_park, 52_000, 2010);
    harness.population(oak_park, 9_000, 1960);

    assert_eq!(
        harness.service.get_population(oak_park, None).unwrap(),
        Some(52_000)
    );
    assert_eq!(
        harness.service.size_class(oak_park, None).unwrap(),
        Some(SizeClass::Large)
    );
    assert_eq!(
        harness.service.size_class(oak_park, Some(1965)).unwrap(),
        Some(SizeClass::Small)
    );
}

#[test]
fn test_years_are_kept_apart() {
    let harness = TestHarness::new();
    two_villages(&harness, 2017);
    harness.import(
        &BatchBuilder::new(2018)
            .record("OAK PARK", None, "VILLAGE MANAGER", ("ANN", "LEE"), 1_000_000)
            .build(),
    );

    assert_eq!(harness.service.years().unwrap(), vec![2018, 2017]);

    let oak_park = harness.unit("OAK PARK");
    let profile_2017 = harness.service.employer_profile(oak_park, Some(2017)).unwrap();
    assert_eq!(profile_2017.headcount, 2);
    let latest = harness.service.employer_profile(oak_park, None).unwrap();
    assert_eq!(latest.year, 2018);
    assert_eq!(latest.headcount, 1);

    let summary = harness.service.year_summary(2018).unwrap();
    assert_eq!(summary.units, 1);
    assert_eq!(summary.departments, 0);
    assert_eq!(summary.total_pay, Money::from_dollars(1_000_000));

    let low_2017 = harness.salary_ids(2017)[0];
    assert_eq!(
        harness.service.employer_percentile(low_2017).unwrap(),
        Percentile::Rank(0.0)
    );
}

#[test]
fn test_data_survives_reopen() {
    let mut harness = TestHarness::new();
    two_villages(&harness, 2017);
    harness.reopen();

    let summary = harness.service.year_summary(2017).unwrap();
    assert_eq!(summary.units, 2);
    assert_eq!(summary.departments, 2);
    assert_eq!(summary.people, 4);
    assert_eq!(summary.median_pay, Some(Money::from_dollars(45_000)));

    let jobs = harness
        .service
        .jobs_of_employer(harness.unit("EVANSTON"), 2017, 10)
        .unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].name, "Dot Fox");
    assert_eq!(jobs[0].employer_name, "Evanston Police");
}

#[test]
fn test_concurrent_percentile_queries() {
    let mut harness = TestHarness::new();
    two_villages(&harness, 2017);
    let municipal = harness.taxonomy("Municipal", false, false);
    harness.classify_unit(harness.unit("OAK PARK"), municipal);
    harness.classify_unit(harness.unit("EVANSTON"), municipal);

    let salaries = harness.salary_ids(2017);
    let expected: Vec<_> = salaries
        .iter()
        .map(|id| harness.service.salary_percentiles(*id).unwrap())
        .collect();
    harness.reopen();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let service = Arc::clone(&harness.service);
            let salaries = salaries.clone();
            thread::spawn(move || {
                salaries
                    .iter()
                    .cycle()
                    .skip(worker)
                    .take(40)
                    .map(|id| service.salary_percentiles(*id).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for result in handle.join().unwrap() {
            let want = expected
                .iter()
                .find(|e| e.salary_id == result.salary_id)
                .unwrap();
            assert_eq!(&result, want);
        }
    }
}

#[test]
fn test_rejected_batch_leaves_no_vintage() {
    let harness = TestHarness::new();
    let batch = BatchBuilder::new(2017)
        .record("OAK PARK", None, "CLERK", ("ANN", "LEE"), 30_000)
        .record("", None, "CLERK", ("BOB", "RAY"), 30_000)
        .build();

    assert!(harness.service.import(&batch).is_err());
    assert!(harness.service.years().unwrap().is_empty());
}

#[test]
fn test_oversized_pay_is_rejected_before_ranking() {
    let harness = TestHarness::new();
    two_villages(&harness, 2017);

    let mut batch = BatchBuilder::new(2017)
        .record("OAK PARK", None, "TREASURER", ("EVE", "ROE"), 1)
        .build();
    batch.records[0].salary = Money::parse("92233720368547758");
    assert!(batch.records[0].salary.unwrap() > MAX_PAY);
    assert!(harness.service.import(&batch).is_err());

    // The earlier import is untouched and still ranks.
    let salaries = harness.salary_ids(2017);
    assert_eq!(salaries.len(), 4);
    for id in salaries {
        assert!(harness.service.salary_percentiles(id).is_ok());
    }
}

#[test]
fn test_department_salary_ranks_with_sibling_departments() {
    let harness = TestHarness::new();
    harness.import(
        &BatchBuilder::new(2017)
            .record("OAK PARK", None, "VILLAGE MANAGER", ("ANN", "LEE"), 30_000)
            .record("OAK PARK", Some("POLICE"), "OFFICER", ("BOB", "RAY"), 45_000)
            .record("OAK PARK", Some("POLICE"), "OFFICER", ("CY", "DEE"), 45_000)
            .record("OAK PARK", Some("FIRE"), "CHIEF", ("DOT", "FOX"), 90_000)
            .build(),
    );

    let ranks: Vec<f64> = harness
        .salary_ids(2017)
        .iter()
        .map(|id| harness.service.employer_percentile(*id).unwrap().value().unwrap())
        .collect();
    assert_eq!(ranks[0], 0.0);
    assert!((ranks[1] - 66.67).abs() < 0.01);
    assert_eq!(ranks[1], ranks[2]);
    assert_eq!(ranks[3], 100.0);
}

#[test]
fn test_import_refreshes_every_cached_year() {
    let harness = TestHarness::new();
    harness.import(
        &BatchBuilder::new(2017)
            .record("OAK PARK", None, "VILLAGE MANAGER", ("ANN", "LEE"), 30_000)
            .build(),
    );
    assert_eq!(harness.service.year_summary(2017).unwrap().units, 1);

    harness.import(
        &BatchBuilder::new(2018)
            .record("EVANSTON", None, "CITY MANAGER", ("CY", "DEE"), 45_000)
            .build(),
    );
    let evanston = harness.unit("EVANSTON");
    let profile = harness
        .service
        .employer_profile(evanston, Some(2017))
        .unwrap();
    assert_eq!(profile.year, 2017);
    assert_eq!(profile.headcount, 0);
}

//! Employer repository: employers, classifications and population readings.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::display::{employer_display_name, unique_slug};
use crate::error::ValidationError;
use crate::model::{
    Employer, EmployerId, EmployerPopulation, EmployerTaxonomy, EmployerUniverse, NewEmployer,
    TaxonomyId, UniverseId, VintageId,
};

pub(crate) fn employer_from_row(row: &Row<'_>) -> Result<Employer, rusqlite::Error> {
    Ok(Employer {
        id: row.get("id")?,
        vintage_id: row.get("vintage_id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
        taxonomy_id: row.get("taxonomy_id")?,
        universe_id: row.get("universe_id")?,
    })
}

pub(crate) fn taxonomy_from_row(row: &Row<'_>) -> Result<EmployerTaxonomy, rusqlite::Error> {
    Ok(EmployerTaxonomy {
        id: row.get("id")?,
        entity_type: row.get("entity_type")?,
        chicago: row.get("chicago")?,
        cook_or_collar: row.get("cook_or_collar")?,
    })
}

pub(crate) fn universe_from_row(row: &Row<'_>) -> Result<EmployerUniverse, rusqlite::Error> {
    Ok(EmployerUniverse {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}

pub(crate) fn population_from_row(row: &Row<'_>) -> Result<EmployerPopulation, rusqlite::Error> {
    Ok(EmployerPopulation {
        employer_id: row.get("employer_id")?,
        population: row.get("population")?,
        data_year: row.get("data_year")?,
    })
}

// ─── Classifications ────────────────────────────────────────────────────────

pub fn insert_taxonomy(
    conn: &Connection,
    entity_type: &str,
    chicago: bool,
    cook_or_collar: bool,
) -> Result<EmployerTaxonomy, DatabaseError> {
    conn.execute(
        "INSERT INTO employer_taxonomies (entity_type, chicago, cook_or_collar) VALUES (?1, ?2, ?3)",
        params![entity_type, chicago, cook_or_collar],
    )?;
    Ok(EmployerTaxonomy {
        id: conn.last_insert_rowid(),
        entity_type: entity_type.to_string(),
        chicago,
        cook_or_collar,
    })
}

pub fn insert_universe(conn: &Connection, name: &str) -> Result<EmployerUniverse, DatabaseError> {
    conn.execute(
        "INSERT INTO employer_universes (name) VALUES (?1)",
        params![name],
    )?;
    Ok(EmployerUniverse {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn list_taxonomies(conn: &Connection) -> Result<Vec<EmployerTaxonomy>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM employer_taxonomies ORDER BY id")?;
    let rows = stmt
        .query_map([], taxonomy_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_universes(conn: &Connection) -> Result<Vec<EmployerUniverse>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM employer_universes ORDER BY id")?;
    let rows = stmt
        .query_map([], universe_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ─── Employers ──────────────────────────────────────────────────────────────

/// Validates and inserts an employer, generating its slug from the display
/// name.
pub fn insert(conn: &Connection, new: &NewEmployer) -> Result<Employer, DatabaseError> {
    new.validate()?;

    let parent = match new.parent_id {
        Some(parent_id) => {
            let parent = find_by_id(conn, parent_id)?.ok_or(ValidationError::UnknownReference {
                kind: "employer",
                id: parent_id,
            })?;
            if parent.is_department() {
                return Err(ValidationError::NestedDepartment {
                    name: new.name.clone(),
                    parent_id,
                }
                .into());
            }
            Some(parent)
        }
        None => None,
    };

    let duplicate = match new.parent_id {
        Some(parent_id) => find_department(conn, parent_id, &new.name)?.is_some(),
        None => find_unit(conn, &new.name)?.is_some(),
    };
    if duplicate {
        return Err(match new.parent_id {
            Some(parent_id) => ValidationError::DuplicateDepartment {
                name: new.name.clone(),
                parent_id,
            },
            None => ValidationError::DuplicateUnit {
                name: new.name.clone(),
            },
        }
        .into());
    }

    let display = employer_display_name(&new.name, parent.as_ref().map(|p| p.name.as_str()));
    let mut slug_check = conn.prepare("SELECT 1 FROM employers WHERE slug = ?1")?;
    let slug = unique_slug(&display, |candidate| {
        slug_check.exists(params![candidate]).unwrap_or(true)
    });

    conn.execute(
        "INSERT INTO employers (vintage_id, slug, name, parent_id, taxonomy_id, universe_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.vintage_id,
            slug,
            new.name,
            new.parent_id,
            new.taxonomy_id,
            new.universe_id,
        ],
    )?;

    let employer = Employer {
        id: conn.last_insert_rowid(),
        vintage_id: new.vintage_id,
        slug,
        name: new.name.clone(),
        parent_id: new.parent_id,
        taxonomy_id: new.taxonomy_id,
        universe_id: new.universe_id,
    };
    log::debug!("Inserted employer {} ({})", employer.id, employer.slug);
    Ok(employer)
}

pub fn find_by_id(conn: &Connection, id: EmployerId) -> Result<Option<Employer>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM employers WHERE id = ?1",
            params![id],
            employer_from_row,
        )
        .optional()?)
}

pub fn find_by_slug(conn: &Connection, slug: &str) -> Result<Option<Employer>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM employers WHERE slug = ?1",
            params![slug],
            employer_from_row,
        )
        .optional()?)
}

pub fn find_unit(conn: &Connection, name: &str) -> Result<Option<Employer>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM employers WHERE parent_id IS NULL AND name = ?1",
            params![name],
            employer_from_row,
        )
        .optional()?)
}

pub fn find_department(
    conn: &Connection,
    parent_id: EmployerId,
    name: &str,
) -> Result<Option<Employer>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM employers WHERE parent_id = ?1 AND name = ?2",
            params![parent_id, name],
            employer_from_row,
        )
        .optional()?)
}

/// Returns the unit named `name`, creating it under `vintage_id` if absent.
/// The flag is true when a row was created.
pub fn get_or_create_unit(
    conn: &Connection,
    vintage_id: VintageId,
    name: &str,
) -> Result<(Employer, bool), DatabaseError> {
    match find_unit(conn, name)? {
        Some(unit) => Ok((unit, false)),
        None => Ok((insert(conn, &NewEmployer::unit(vintage_id, name))?, true)),
    }
}

pub fn get_or_create_department(
    conn: &Connection,
    vintage_id: VintageId,
    parent_id: EmployerId,
    name: &str,
) -> Result<(Employer, bool), DatabaseError> {
    match find_department(conn, parent_id, name)? {
        Some(department) => Ok((department, false)),
        None => Ok((
            insert(conn, &NewEmployer::department(vintage_id, name, parent_id))?,
            true,
        )),
    }
}

/// Units first, then departments, each by id.
pub fn list(conn: &Connection) -> Result<Vec<Employer>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM employers ORDER BY parent_id IS NOT NULL, id")?;
    let rows = stmt
        .query_map([], employer_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn departments(conn: &Connection, unit_id: EmployerId) -> Result<Vec<Employer>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM employers WHERE parent_id = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![unit_id], employer_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Classifies a unit. Departments cannot carry a taxonomy.
pub fn set_taxonomy(
    conn: &Connection,
    employer_id: EmployerId,
    taxonomy_id: Option<TaxonomyId>,
) -> Result<(), DatabaseError> {
    let mut employer = find_by_id(conn, employer_id)?.ok_or(ValidationError::UnknownReference {
        kind: "employer",
        id: employer_id,
    })?;
    employer.taxonomy_id = taxonomy_id;
    employer.validate()?;

    conn.execute(
        "UPDATE employers SET taxonomy_id = ?2 WHERE id = ?1",
        params![employer_id, taxonomy_id],
    )?;
    Ok(())
}

/// Classifies a department. Units cannot carry a universe.
pub fn set_universe(
    conn: &Connection,
    employer_id: EmployerId,
    universe_id: Option<UniverseId>,
) -> Result<(), DatabaseError> {
    let mut employer = find_by_id(conn, employer_id)?.ok_or(ValidationError::UnknownReference {
        kind: "employer",
        id: employer_id,
    })?;
    employer.universe_id = universe_id;
    employer.validate()?;

    conn.execute(
        "UPDATE employers SET universe_id = ?2 WHERE id = ?1",
        params![employer_id, universe_id],
    )?;
    Ok(())
}

/// Deletes an employer with its departments, positions, jobs and salaries.
pub fn delete(conn: &Connection, id: EmployerId) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM employers WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ─── Population ─────────────────────────────────────────────────────────────

pub fn add_population(conn: &Connection, reading: &EmployerPopulation) -> Result<(), DatabaseError> {
    let exists = conn
        .prepare("SELECT 1 FROM employer_populations WHERE employer_id = ?1 AND data_year = ?2")?
        .exists(params![reading.employer_id, reading.data_year])?;
    if exists {
        return Err(ValidationError::DuplicatePopulation {
            employer_id: reading.employer_id,
            data_year: reading.data_year,
        }
        .into());
    }

    conn.execute(
        "INSERT INTO employer_populations (employer_id, population, data_year) VALUES (?1, ?2, ?3)",
        params![reading.employer_id, reading.population, reading.data_year],
    )?;
    Ok(())
}

pub fn populations(
    conn: &Connection,
    employer_id: EmployerId,
) -> Result<Vec<EmployerPopulation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM employer_populations WHERE employer_id = ?1 ORDER BY data_year",
    )?;
    let rows = stmt
        .query_map(params![employer_id], population_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_populations(conn: &Connection) -> Result<Vec<EmployerPopulation>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM employer_populations ORDER BY employer_id, data_year")?;
    let rows = stmt
        .query_map([], population_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

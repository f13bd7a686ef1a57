//! Lookup-row seeding — workflow statuses, priorities, optional demo data.
//!
//! Idempotent — uses ON CONFLICT DO NOTHING, so it runs unconditionally on
//! every boot. The lifecycle depends on the four status rows existing; a
//! deployment that loses them fails with SeedDataMissing on first use.

use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl;

use crate::lifecycle::DefectStatus;
use crate::principal::Role;

/// Seed the status and priority lookup tables.
pub async fn seed_lookup_tables(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    // Workflow statuses, ids 1-4 in workflow order.
    for (id, status) in DefectStatus::ALL.iter().enumerate() {
        diesel::sql_query(format!(
            "INSERT INTO statuses (id, name) VALUES ({}, '{}') ON CONFLICT (id) DO NOTHING",
            id + 1,
            status.name()
        ))
        .execute(conn)
        .await?;
    }

    let priorities: [(i64, &str); 4] =
        [(1, "Low"), (2, "Medium"), (3, "High"), (4, "Critical")];
    for (id, name) in priorities {
        diesel::sql_query(format!(
            "INSERT INTO priorities (id, name) VALUES ({id}, '{name}') ON CONFLICT (id) DO NOTHING"
        ))
        .execute(conn)
        .await?;
    }

    // Keep the sequences ahead of the fixed ids.
    diesel::sql_query(
        "SELECT setval('statuses_id_seq', GREATEST((SELECT COALESCE(MAX(id), 0) FROM statuses), 4))",
    )
    .execute(conn)
    .await?;
    diesel::sql_query(
        "SELECT setval('priorities_id_seq', GREATEST((SELECT COALESCE(MAX(id), 0) FROM priorities), 4))",
    )
    .execute(conn)
    .await?;

    tracing::info!("Lookup tables seeded");
    Ok(())
}

/// Seed a small demo data set: one user per role, two projects with stages,
/// and grants on the first project for the engineer and manager.
pub async fn seed_demo_data(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    let users: [(i64, &str, Role); 3] = [
        (1, "Lena Orlova", Role::Leader),
        (2, "Mark Petrov", Role::Manager),
        (3, "Egor Smirnov", Role::Engineer),
    ];
    for (id, full_name, role) in users {
        diesel::sql_query(format!(
            "INSERT INTO users (id, full_name, role) VALUES ({id}, '{full_name}', '{}') \
             ON CONFLICT (id) DO NOTHING",
            role.as_str()
        ))
        .execute(conn)
        .await?;
    }

    let projects: [(i64, &str); 2] = [(1, "Riverside Towers"), (2, "North Depot")];
    for (id, name) in projects {
        diesel::sql_query(format!(
            "INSERT INTO projects (id, name, status) VALUES ({id}, '{name}', 'active') \
             ON CONFLICT (id) DO NOTHING"
        ))
        .execute(conn)
        .await?;
    }

    let stages: [(i64, i64, &str); 3] = [
        (1, 1, "Foundation"),
        (2, 1, "Framing"),
        (3, 2, "Site preparation"),
    ];
    for (id, project_id, name) in stages {
        diesel::sql_query(format!(
            "INSERT INTO stages (id, project_id, name) VALUES ({id}, {project_id}, '{name}') \
             ON CONFLICT (id) DO NOTHING"
        ))
        .execute(conn)
        .await?;
    }

    // Engineer and manager get access to project 1 only.
    for user_id in [2i64, 3] {
        diesel::sql_query(format!(
            "INSERT INTO project_access (user_id, project_id, has_access) VALUES ({user_id}, 1, TRUE) \
             ON CONFLICT (user_id, project_id) DO NOTHING"
        ))
        .execute(conn)
        .await?;
    }

    for (seq, max) in [
        ("users_id_seq", 3),
        ("projects_id_seq", 2),
        ("stages_id_seq", 3),
    ] {
        diesel::sql_query(format!(
            "SELECT setval('{seq}', GREATEST((SELECT COALESCE(MAX(id), 0) FROM {}), {max}))",
            seq.trim_end_matches("_id_seq")
        ))
        .execute(conn)
        .await?;
    }

    tracing::info!("Demo data seeded");
    Ok(())
}

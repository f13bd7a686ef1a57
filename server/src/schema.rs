//! Diesel table definitions for the defect tracking platform.
//!
//! Tables: users, projects, stages, priorities, statuses, defects,
//! project_access, defect_history, comments.

diesel::table! {
    users (id) {
        id -> Int8,
        full_name -> Varchar,
        role -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    projects (id) {
        id -> Int8,
        name -> Varchar,
        description -> Nullable<Text>,
        start_date -> Nullable<Date>,
        end_date -> Nullable<Date>,
        status -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    stages (id) {
        id -> Int8,
        project_id -> Int8,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    priorities (id) {
        id -> Int8,
        name -> Varchar,
    }
}

diesel::table! {
    statuses (id) {
        id -> Int8,
        name -> Varchar,
    }
}

diesel::table! {
    defects (id) {
        id -> Int8,
        title -> Varchar,
        description -> Text,
        project_id -> Int8,
        stage_id -> Nullable<Int8>,
        creator_id -> Int8,
        assignee_id -> Nullable<Int8>,
        priority_id -> Int8,
        status_id -> Int8,
        due_date -> Nullable<Date>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    project_access (id) {
        id -> Int8,
        user_id -> Int8,
        project_id -> Int8,
        has_access -> Bool,
        granted_at -> Timestamptz,
    }
}

diesel::table! {
    defect_history (id) {
        id -> Int8,
        defect_id -> Int8,
        user_id -> Int8,
        action -> Varchar,
        old_value -> Nullable<Text>,
        new_value -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Int8,
        defect_id -> Int8,
        user_id -> Int8,
        content -> Text,
        created_at -> Timestamptz,
    }
}

// Foreign key relationships. defects references users twice
// (creator_id, assignee_id), so its user joins stay explicit.
diesel::joinable!(stages -> projects (project_id));
diesel::joinable!(defects -> projects (project_id));
diesel::joinable!(defects -> stages (stage_id));
diesel::joinable!(defects -> priorities (priority_id));
diesel::joinable!(defects -> statuses (status_id));
diesel::joinable!(project_access -> users (user_id));
diesel::joinable!(project_access -> projects (project_id));
diesel::joinable!(defect_history -> defects (defect_id));
diesel::joinable!(defect_history -> users (user_id));
diesel::joinable!(comments -> defects (defect_id));
diesel::joinable!(comments -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    projects,
    stages,
    priorities,
    statuses,
    defects,
    project_access,
    defect_history,
    comments,
);

//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes a table, update the matching block here (or regenerate
//! with `diesel print-schema`).

diesel::table! {
    /// Schools owning every other record.
    schools (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Vehicles a driver may be allocated.
    vehicles (id) {
        id -> Uuid,
        school_id -> Uuid,
        vehicle_name -> Varchar,
        vehicle_number -> Varchar,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Driver directory.
    drivers (id) {
        id -> Uuid,
        school_id -> Uuid,
        vehicle_id -> Nullable<Uuid>,
        username -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Student directory.
    students (id) {
        id -> Uuid,
        school_id -> Uuid,
        first_name -> Varchar,
        last_name -> Varchar,
        pickup_point -> Nullable<Text>,
        deleted_at -> Nullable<Timestamptz>,
        parent_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// School-scoped shuttle routes. Soft-deleted via `deleted_at`.
    routes (id) {
        id -> Uuid,
        school_id -> Uuid,
        name -> Varchar,
        description -> Text,
        created_at -> Timestamptz,
        created_by -> Varchar,
        updated_at -> Nullable<Timestamptz>,
        updated_by -> Nullable<Varchar>,
        deleted_at -> Nullable<Timestamptz>,
        deleted_by -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Driver/student bindings to a route.
    ///
    /// `route_assignments_active_student_idx` keeps one active row per
    /// student.
    route_assignments (id) {
        id -> Uuid,
        route_id -> Uuid,
        school_id -> Uuid,
        driver_id -> Uuid,
        student_id -> Uuid,
        student_order -> Varchar,
        created_at -> Timestamptz,
        created_by -> Varchar,
        updated_at -> Nullable<Timestamptz>,
        updated_by -> Nullable<Varchar>,
        deleted_at -> Nullable<Timestamptz>,
        deleted_by -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// One active row per driver naming the route they are bound to.
    ///
    /// `driver_route_claims_active_driver_idx` enforces driver exclusivity.
    driver_route_claims (id) {
        id -> Uuid,
        driver_id -> Uuid,
        route_id -> Uuid,
        school_id -> Uuid,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Daily per-student trip status kept by drivers.
    ///
    /// `trip_records_student_day_idx` keeps one row per student per day.
    trip_records (id) {
        id -> Uuid,
        school_id -> Uuid,
        route_id -> Uuid,
        driver_id -> Uuid,
        student_id -> Uuid,
        service_date -> Date,
        status -> Varchar,
        created_at -> Timestamptz,
        created_by -> Varchar,
        updated_at -> Nullable<Timestamptz>,
        updated_by -> Nullable<Varchar>,
    }
}

diesel::joinable!(vehicles -> schools (school_id));
diesel::joinable!(drivers -> vehicles (vehicle_id));
diesel::joinable!(students -> schools (school_id));
diesel::joinable!(routes -> schools (school_id));
diesel::joinable!(route_assignments -> routes (route_id));
diesel::joinable!(route_assignments -> drivers (driver_id));
diesel::joinable!(route_assignments -> students (student_id));
diesel::joinable!(driver_route_claims -> routes (route_id));
diesel::joinable!(driver_route_claims -> drivers (driver_id));
diesel::joinable!(trip_records -> routes (route_id));
diesel::joinable!(trip_records -> drivers (driver_id));
diesel::joinable!(trip_records -> students (student_id));

diesel::allow_tables_to_appear_in_same_query!(
    schools,
    vehicles,
    drivers,
    students,
    routes,
    route_assignments,
    driver_route_claims,
    trip_records,
);

// @generated automatically, shape mirrors the migrations in `migrations/`.

diesel::table! {
    notams (id) {
        id -> Integer,
        notam_id -> Text,
        series -> Text,
        number -> Nullable<Integer>,
        year -> Nullable<Integer>,
        kind -> Text,
        replaces_id -> Nullable<Text>,
        cancels_id -> Nullable<Text>,
        fir -> Nullable<Text>,
        q_code -> Nullable<Text>,
        q_subject -> Nullable<Text>,
        q_condition -> Nullable<Text>,
        traffic -> Nullable<Text>,
        purpose -> Nullable<Text>,
        scope -> Nullable<Text>,
        lower_limit -> Nullable<Integer>,
        upper_limit -> Nullable<Integer>,
        coordinates -> Nullable<Text>,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        radius_nm -> Nullable<Integer>,
        location -> Nullable<Text>,
        valid_from -> Nullable<Timestamp>,
        valid_to -> Nullable<Timestamp>,
        is_permanent -> Bool,
        schedule -> Nullable<Text>,
        body -> Nullable<Text>,
        lower_limit_text -> Nullable<Text>,
        upper_limit_text -> Nullable<Text>,
        airport_code -> Nullable<Text>,
        airport_name -> Nullable<Text>,
        issue_date -> Nullable<Timestamp>,
        source -> Nullable<Text>,
        source_type -> Nullable<Text>,
        transaction_id -> Nullable<BigInt>,
        has_history -> Bool,
        raw_icao_message -> Nullable<Text>,
        is_closure -> Bool,
        is_drone_related -> Bool,
        is_restriction -> Bool,
        is_trigger -> Bool,
        search_term -> Nullable<Text>,
        priority_score -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    search_runs (id) {
        id -> Integer,
        mode -> Text,
        search_term -> Nullable<Text>,
        airport_codes -> Nullable<Text>,
        total_fetched -> Integer,
        new_inserted -> Integer,
        updated -> Integer,
        run_at -> Timestamp,
    }
}

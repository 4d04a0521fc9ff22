//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Shoppers resolved from sign-in identifiers.
    users (id) {
        id -> Uuid,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        display_name -> Varchar,
        created_at -> Timestamptz,
        avatar_url -> Nullable<Varchar>,
        bio -> Nullable<Varchar>,
        address_line1 -> Nullable<Varchar>,
        address_line2 -> Nullable<Varchar>,
        city -> Nullable<Varchar>,
        state -> Nullable<Varchar>,
        postal_code -> Nullable<Varchar>,
        country -> Nullable<Varchar>,
        default_currency -> Nullable<Varchar>,
        preferences -> Nullable<Jsonb>,
    }
}

diesel::table! {
    /// Catalog products, maintained by import tooling.
    products (id) {
        id -> Uuid,
        slug -> Varchar,
        title -> Varchar,
        description -> Text,
        price_cents -> Int8,
        currency -> Varchar,
        rating -> Float8,
        images -> Array<Text>,
        stock -> Int4,
        category -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Rental terms; one row per rentable product.
    rental_policies (product_id) {
        product_id -> Uuid,
        min_days -> Int4,
        max_days -> Int4,
        daily_price_cents -> Int8,
        deposit_cents -> Int8,
    }
}

diesel::table! {
    /// Cart lines. `hold_id` is unique across all lines.
    cart_items (id) {
        id -> Uuid,
        user_id -> Uuid,
        product_id -> Uuid,
        qty -> Int4,
        kind -> Varchar,
        start_date -> Nullable<Timestamptz>,
        end_date -> Nullable<Timestamptz>,
        hold_id -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Orders. `payment_reference` is unique.
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        status -> Varchar,
        total_cents -> Int8,
        discount_cents -> Int8,
        payment_reference -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Order lines with captured prices.
    order_items (id) {
        id -> Uuid,
        order_id -> Uuid,
        product_id -> Uuid,
        qty -> Int4,
        kind -> Varchar,
        price_cents -> Int8,
        position -> Int4,
    }
}

diesel::table! {
    /// Checkout snapshots keyed by payment reference.
    checkout_sessions (payment_reference) {
        payment_reference -> Varchar,
        user_id -> Uuid,
        snapshot -> Jsonb,
        status -> Varchar,
        order_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Group-buy commitments.
    group_buys (id) {
        id -> Uuid,
        product_id -> Uuid,
        creator_id -> Uuid,
        min_participants -> Int4,
        deadline -> Timestamptz,
        status -> Varchar,
        settlement_started_at -> Nullable<Timestamptz>,
        settled_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Group-buy participants, unique per user.
    group_buy_participants (group_buy_id, user_id) {
        group_buy_id -> Uuid,
        user_id -> Uuid,
        intent -> Bool,
        joined_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency claims and response snapshots.
    ///
    /// The composite primary key scopes a key to its user and mutation type.
    idempotency_keys (key, user_id, mutation_type) {
        key -> Uuid,
        user_id -> Uuid,
        mutation_type -> Varchar,
        payload_hash -> Bytea,
        response_snapshot -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(rental_policies -> products (product_id));
diesel::joinable!(cart_items -> products (product_id));
diesel::joinable!(cart_items -> users (user_id));
diesel::joinable!(orders -> users (user_id));
diesel::joinable!(order_items -> orders (order_id));
diesel::joinable!(checkout_sessions -> users (user_id));
diesel::joinable!(group_buys -> products (product_id));
diesel::joinable!(group_buy_participants -> group_buys (group_buy_id));
diesel::joinable!(idempotency_keys -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    products,
    rental_policies,
    cart_items,
    orders,
    order_items,
    checkout_sessions,
    group_buys,
    group_buy_participants,
    idempotency_keys,
);

diesel::table! {
    order_products (id) {
        id -> Int4,
        order_id -> Int4,
        product_id -> Int4,
        qty -> Int4,
    }
}

diesel::table! {
    orders (id) {
        id -> Int4,
        table_id -> Int4,
        customer_name -> Varchar,
        status -> Varchar,
        total_amount -> Numeric,
        tax -> Numeric,
        payment_method -> Nullable<Varchar>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    payments (id) {
        id -> Int4,
        name -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    products (id) {
        id -> Int4,
        name -> Varchar,
        price -> Numeric,
        qty -> Int4,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    tables (id) {
        id -> Int4,
        name -> Varchar,
        is_book -> Bool,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(order_products -> orders (order_id));
diesel::joinable!(order_products -> products (product_id));
diesel::joinable!(orders -> tables (table_id));

diesel::allow_tables_to_appear_in_same_query!(
    order_products,
    orders,
    payments,
    products,
    tables,
);

//! Declarative macro for record types.
//!
//! `record!` declares a struct and, alongside it, the static field-descriptor
//! table and value accessors the projector and the column mapper work from.
//!
//! # Example
//!
//! ```ignore
//! db_table_mapper::record! {
//!     #[derive(Debug, Clone, Default)]
//!     pub struct Customer {
//!         pub id: i64 => "Id",
//!         pub name: Option<String>,
//!         pub address: Option<Address> as nested,
//!     }
//! }
//! ```
//!
//! `=> "Column"` overrides the column name of a field. `as nested` marks a
//! field that holds another record type; such fields are registered with the
//! column mapper recursively and take `Default::default()` when a row is
//! mapped.

#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $column:literal)? $(as $nested:ident)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::models::FieldSource for $name {
            #[allow(unused_mut)]
            fn field_values(&self) -> ::std::vec::Vec<(&str, $crate::models::CellValue)> {
                let mut values = ::std::vec::Vec::new();
                $(
                    $crate::__record_field_value!(
                        values, self.$field, stringify!($field), $ty $(, $nested)?
                    );
                )*
                values
            }
        }

        impl $crate::models::Record for $name {
            fn shape() -> &'static $crate::models::RecordShape {
                static SHAPE: $crate::models::RecordShape = $crate::models::RecordShape::new(
                    stringify!($name),
                    &[
                        $(
                            $crate::models::FieldDescriptor::new(
                                stringify!($field),
                                $crate::__record_field_type!($ty $(, $nested)?),
                                $crate::__record_column!($($column)?),
                            ),
                        )*
                    ],
                );
                &SHAPE
            }
        }

        impl $crate::models::NestedRecord for $name {
            fn nested_shape() -> &'static $crate::models::RecordShape {
                <Self as $crate::models::Record>::shape()
            }
        }

        impl $crate::models::FromFields for $name {
            #[allow(unused_variables)]
            fn from_fields(
                fields: &mut $crate::models::FieldValues,
            ) -> $crate::error::DbResult<Self> {
                Ok(Self {
                    $(
                        $field: $crate::__record_take_field!(
                            fields, stringify!($field), $ty $(, $nested)?
                        ),
                    )*
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_field_type {
    ($ty:ty, nested) => {
        $crate::models::FieldType::Nested(<$ty as $crate::models::NestedRecord>::nested_shape)
    };
    ($ty:ty) => {
        $crate::models::FieldType::Scalar(<$ty as $crate::models::FieldValue>::SCALAR)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_column {
    () => {
        ::core::option::Option::None
    };
    ($column:literal) => {
        ::core::option::Option::Some($column)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_field_value {
    ($values:ident, $value:expr, $name:expr, $ty:ty, nested) => {};
    ($values:ident, $value:expr, $name:expr, $ty:ty) => {
        $values.push((
            $name,
            <$ty as $crate::models::FieldValue>::to_cell(&$value),
        ));
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_take_field {
    ($fields:ident, $name:expr, $ty:ty, nested) => {
        <$ty as ::core::default::Default>::default()
    };
    ($fields:ident, $name:expr, $ty:ty) => {
        $fields.take::<$ty>($name)?
    };
}

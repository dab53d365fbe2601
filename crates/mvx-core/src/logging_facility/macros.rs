//! Boundary logging macros
//!
//! A boundary operation logs `start`, then exactly one `end` or `end_error`
//! carrying `duration_ms`. The `context = ...` forms spread an
//! [`OpContext`](crate::logging_facility::OpContext) over the schema fields.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use mvx_core::log_op_start;
/// use mvx_core::logging_facility::OpContext;
/// use mvx_core::Role;
///
/// log_op_start!("set_data", context = OpContext::new("Session").with_role(Role::DATA));
/// log_op_start!("destroy", model_type = "Session");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr, context = $ctx:expr) => {{
        let ctx: &$crate::logging_facility::OpContext = &$ctx;
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_START,
            model_type = ctx.model_type.as_str(),
            item_id = ctx.item_id.as_deref(),
            tag = ctx.tag.as_deref(),
            row = ctx.row,
            role = ctx.role_value(),
        );
    }};
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// The context form also reports the undo stack position.
///
/// # Example
///
/// ```
/// # use mvx_core::log_op_end;
/// use mvx_core::logging_facility::OpContext;
///
/// log_op_end!("undo", duration_ms = 3, context = OpContext::new("Session"));
/// log_op_end!("destroy", duration_ms = 0);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr, context = $ctx:expr) => {{
        let ctx: &$crate::logging_facility::OpContext = &$ctx;
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_END,
            duration_ms = $duration,
            model_type = ctx.model_type.as_str(),
            item_id = ctx.item_id.as_deref(),
            tag = ctx.tag.as_deref(),
            row = ctx.row,
            role = ctx.role_value(),
            stack_index = ctx.stack_index,
            stack_count = ctx.stack_count,
        );
    }};
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
}

/// Log an operation error
///
/// `tag`, `row` and `item_id` come from the error's own context, falling
/// back to the operation context when the error carries none.
///
/// # Example
///
/// ```
/// # use mvx_core::{log_op_error, errors::MvxError};
/// let err = MvxError::SlotEmpty { tag: "items".to_string(), row: 4 };
/// log_op_error!("take_item", err, duration_ms = 0);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr, context = $ctx:expr) => {{
        let ctx: &$crate::logging_facility::OpContext = &$ctx;
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            model_type = ctx.model_type.as_str(),
            item_id = ex_err.item_id().or(ctx.item_id.as_deref()),
            tag = ex_err.tag().or(ctx.tag.as_deref()),
            row = ex_err.row().or(ctx.row),
            role = ctx.role_value(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::mvx_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            item_id = ex_err.item_id(),
            tag = ex_err.tag(),
            row = ex_err.row(),
        );
    }};
}

pub mod prelude {
    pub use entity::prelude::*;
    pub use entity::sea_orm_active_enums::*;
    pub use entity::{
        automation, automation_queue_item, automation_run, automation_step, campaign,
        deferred_notification, segment, segment_member,
    };
    pub use sea_orm::sea_query::Expr;
    pub use sea_orm::{
        entity::*, query::*, ActiveValue, DatabaseConnection, DbErr, FromQueryResult, RuntimeErr,
    };
}

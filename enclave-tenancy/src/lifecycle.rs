use crate::error::TenancyResult;
use crate::gate::check_write_permission_for;

/// Persistence lifecycle hooks with the write gate built in.
///
/// Entities call `before_save` / `before_delete` ahead of any storage side
/// effect. Overrides must keep the gate check.
pub trait WriteGuarded {
    /// Entity type name used in denial messages.
    fn entity_name(&self) -> &str;

    fn before_save(&self) -> TenancyResult<()> {
        check_write_permission_for(self.entity_name())
    }

    fn before_delete(&self) -> TenancyResult<()> {
        check_write_permission_for(self.entity_name())
    }
}

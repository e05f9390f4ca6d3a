use crate::store::Scope;
use seqkeep_model::{SequenceAccessor, SequenceConfig};

/// Builds the group-scoped view an entity's sequence lives in.
///
/// Restricted to the entity's own type when the accessor reports one, then
/// one equality predicate per configured group attribute, in configured
/// order, carrying the entity's own value for it.
pub fn scope_for<E, A>(config: &SequenceConfig, accessor: &A, entity: &E) -> Scope
where
    A: SequenceAccessor<E> + ?Sized,
{
    let scope = match accessor.entity_type(entity) {
        Some(entity_type) => Scope::whole(config.field_name.clone()).of_type(entity_type),
        None => Scope::whole(config.field_name.clone()),
    };
    config.group.iter().fold(scope, |scope, attribute| {
        let value = accessor.group_value(entity, attribute);
        scope.with(attribute.clone(), value)
    })
}

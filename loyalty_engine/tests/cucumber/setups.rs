use cucumber::given;

use crate::cucumber::{loyalty_world::LoyaltySystem, LoyaltyWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LoyaltyWorld) {
    let system = LoyaltySystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a user '{word}'")]
async fn register_user(world: &mut LoyaltyWorld, login: String) {
    let system = world.system();
    let user = system.accounts.register(&login, "not-a-real-hash").await.expect("Error registering user");
    system.users.insert(login, user);
}

mod recommendation_test;
